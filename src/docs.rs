// src/docs.rs

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::OpenApi;

use crate::access::Role;
use crate::handlers;
use crate::models;
use crate::services::reminder_sweep::SweepReport;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Auth ---
        handlers::auth::register,
        handlers::auth::login,

        // --- Users ---
        handlers::users::get_me,
        handlers::users::list_users,
        handlers::users::get_user,
        handlers::users::create_user,
        handlers::users::update_user,
        handlers::users::deactivate_user,

        // --- Office ---
        handlers::office::get_office,
        handlers::office::update_office,

        // --- Clients ---
        handlers::clients::list_clients,
        handlers::clients::get_client,
        handlers::clients::create_client,
        handlers::clients::update_client,
        handlers::clients::delete_client,

        // --- Cases ---
        handlers::cases::list_cases,
        handlers::cases::get_case,
        handlers::cases::create_case,
        handlers::cases::update_case,
        handlers::cases::delete_case,

        // --- Court sessions ---
        handlers::sessions::list_sessions,
        handlers::sessions::get_session,
        handlers::sessions::create_session,
        handlers::sessions::update_session,
        handlers::sessions::delete_session,

        // --- Documents ---
        handlers::documents::list_documents,
        handlers::documents::get_document,
        handlers::documents::create_document,
        handlers::documents::update_document,
        handlers::documents::delete_document,

        // --- Invoices ---
        handlers::invoices::list_invoices,
        handlers::invoices::get_invoice,
        handlers::invoices::create_invoice,
        handlers::invoices::update_invoice,
        handlers::invoices::delete_invoice,
        handlers::invoices::record_payment,
        handlers::invoices::download_invoice_pdf,

        // --- Tasks ---
        handlers::tasks::list_tasks,
        handlers::tasks::get_task,
        handlers::tasks::create_task,
        handlers::tasks::update_task,
        handlers::tasks::delete_task,

        // --- Notifications ---
        handlers::notifications::list_notifications,
        handlers::notifications::unread_count,
        handlers::notifications::mark_read,
        handlers::notifications::mark_all_read,
        handlers::notifications::run_sweep,

        // --- Activities / Dashboard ---
        handlers::activities::list_activities,
        handlers::dashboard::get_summary,
    ),
    components(
        schemas(
            Role,
            SweepReport,

            // --- Auth / Users / Office ---
            models::auth::User,
            models::auth::RegisterOfficePayload,
            models::auth::LoginUserPayload,
            models::auth::CreateUserPayload,
            models::auth::UpdateUserPayload,
            models::auth::AuthResponse,
            models::office::Office,
            models::office::UpdateOfficePayload,

            // --- Clients / Cases ---
            models::client::Client,
            models::client::CreateClientPayload,
            models::client::UpdateClientPayload,
            models::case::CaseStatus,
            models::case::Case,
            models::case::CreateCasePayload,
            models::case::UpdateCasePayload,

            // --- Court sessions / Documents ---
            models::court_session::CourtSessionStatus,
            models::court_session::CourtSession,
            models::court_session::CreateCourtSessionPayload,
            models::court_session::UpdateCourtSessionPayload,
            models::document::Document,
            models::document::CreateDocumentPayload,
            models::document::UpdateDocumentPayload,

            // --- Invoices ---
            models::invoice::InvoiceStatus,
            models::invoice::Invoice,
            models::invoice::InvoicePayment,
            models::invoice::InvoiceDetail,
            models::invoice::CreateInvoicePayload,
            models::invoice::UpdateInvoicePayload,
            models::invoice::RecordPaymentPayload,

            // --- Tasks ---
            models::task::TaskStatus,
            models::task::TaskPriority,
            models::task::Task,
            models::task::CreateTaskPayload,
            models::task::UpdateTaskPayload,

            // --- Notifications / Activities / Dashboard ---
            models::notification::NotificationKind,
            models::notification::Notification,
            models::notification::UnreadCount,
            models::activity::ActivityAction,
            models::activity::Activity,
            models::dashboard::DashboardSummary,

        )
    ),
    tags(
        (name = "Auth", description = "Registro do escritório e login"),
        (name = "Users", description = "Equipe do escritório"),
        (name = "Office", description = "Identidade visual do escritório"),
        (name = "Clients", description = "Clientes do escritório"),
        (name = "Cases", description = "Processos"),
        (name = "Court sessions", description = "Sessões / audiências"),
        (name = "Documents", description = "Metadados de documentos"),
        (name = "Invoices", description = "Faturas e pagamentos"),
        (name = "Tasks", description = "Tarefas"),
        (name = "Notifications", description = "Notificações e varredura de lembretes"),
        (name = "Activities", description = "Log de auditoria"),
        (name = "Dashboard", description = "Indicadores do usuário")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme("api_jwt", SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)));
    }
}
