// src/routes.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppState;
use crate::docs::ApiDoc;
use crate::handlers;
use crate::middleware::auth::auth_guard;

pub fn app(app_state: AppState) -> Router {
    // Rotas públicas
    let auth_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    let user_routes = Router::new()
        .route("/me", get(handlers::users::get_me))
        .route("/", get(handlers::users::list_users).post(handlers::users::create_user))
        .route(
            "/{id}",
            get(handlers::users::get_user)
                .put(handlers::users::update_user)
                .delete(handlers::users::deactivate_user),
        );

    let office_routes = Router::new().route(
        "/",
        get(handlers::office::get_office).put(handlers::office::update_office),
    );

    let client_routes = Router::new()
        .route("/", get(handlers::clients::list_clients).post(handlers::clients::create_client))
        .route(
            "/{id}",
            get(handlers::clients::get_client)
                .put(handlers::clients::update_client)
                .delete(handlers::clients::delete_client),
        );

    let case_routes = Router::new()
        .route("/", get(handlers::cases::list_cases).post(handlers::cases::create_case))
        .route(
            "/{id}",
            get(handlers::cases::get_case)
                .put(handlers::cases::update_case)
                .delete(handlers::cases::delete_case),
        );

    let session_routes = Router::new()
        .route("/", get(handlers::sessions::list_sessions).post(handlers::sessions::create_session))
        .route(
            "/{id}",
            get(handlers::sessions::get_session)
                .put(handlers::sessions::update_session)
                .delete(handlers::sessions::delete_session),
        );

    let document_routes = Router::new()
        .route("/", get(handlers::documents::list_documents).post(handlers::documents::create_document))
        .route(
            "/{id}",
            get(handlers::documents::get_document)
                .put(handlers::documents::update_document)
                .delete(handlers::documents::delete_document),
        );

    let invoice_routes = Router::new()
        .route("/", get(handlers::invoices::list_invoices).post(handlers::invoices::create_invoice))
        .route(
            "/{id}",
            get(handlers::invoices::get_invoice)
                .put(handlers::invoices::update_invoice)
                .delete(handlers::invoices::delete_invoice),
        )
        .route("/{id}/payments", post(handlers::invoices::record_payment))
        .route("/{id}/pdf", get(handlers::invoices::download_invoice_pdf));

    let task_routes = Router::new()
        .route("/", get(handlers::tasks::list_tasks).post(handlers::tasks::create_task))
        .route(
            "/{id}",
            get(handlers::tasks::get_task)
                .put(handlers::tasks::update_task)
                .delete(handlers::tasks::delete_task),
        );

    let notification_routes = Router::new()
        .route("/", get(handlers::notifications::list_notifications))
        .route("/unread-count", get(handlers::notifications::unread_count))
        .route("/read-all", post(handlers::notifications::mark_all_read))
        .route("/sweep", post(handlers::notifications::run_sweep))
        .route("/{id}/read", post(handlers::notifications::mark_read));

    // Tudo abaixo exige token válido
    let protected = Router::new()
        .nest("/api/users", user_routes)
        .nest("/api/office", office_routes)
        .nest("/api/clients", client_routes)
        .nest("/api/cases", case_routes)
        .nest("/api/sessions", session_routes)
        .nest("/api/documents", document_routes)
        .nest("/api/invoices", invoice_routes)
        .nest("/api/tasks", task_routes)
        .nest("/api/notifications", notification_routes)
        .route("/api/activities", get(handlers::activities::list_activities))
        .route("/api/dashboard/summary", get(handlers::dashboard::get_summary))
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .merge(protected)
        .with_state(app_state)
}
