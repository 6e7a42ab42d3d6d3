// src/config.rs

use std::{env, path::PathBuf, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{
        ActivityRepository, CaseRepository, ClientRepository, CourtSessionRepository, DocumentRepository,
        InvoiceRepository, NotificationRepository, OfficeRepository, PgSweepStore, TaskRepository, UserRepository,
    },
    services::{
        activity_service::ActivityService,
        auth::AuthService,
        case_service::CaseService,
        client_service::ClientService,
        court_session_service::CourtSessionService,
        dashboard_service::DashboardService,
        document_service::DocumentService,
        email::{EmailTransport, HttpEmailTransport, LogEmailTransport},
        invoice_service::InvoiceService,
        notification_service::{EmailDispatcher, NotificationService},
        office_service::OfficeService,
        reminder_sweep::ReminderSweep,
        task_service::TaskService,
        user_service::UserService,
    },
};

// Configuração lida do ambiente (.env em desenvolvimento)
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub db_max_connections: u32,

    pub session_sweep_interval: Duration,
    pub task_sweep_interval: Duration,

    pub email_notifications_enabled: bool,
    pub email_api_url: Option<String>,
    pub email_api_key: Option<String>,
    pub email_from: String,
    pub email_timeout: Duration,

    pub pdf_font_dir: PathBuf,
}

fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} inválido ({}): {}", key, raw, e)),
        _ => Ok(default),
    }
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL deve ser definida")?,
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?,
            bind_addr: env_or("BIND_ADDR", "0.0.0.0:3000".to_string())?,
            db_max_connections: env_or("DB_MAX_CONNECTIONS", 5)?,
            session_sweep_interval: Duration::from_secs(env_or("SESSION_SWEEP_INTERVAL_SECS", 1800)?),
            task_sweep_interval: Duration::from_secs(env_or("TASK_SWEEP_INTERVAL_SECS", 3600)?),
            email_notifications_enabled: env_or("EMAIL_NOTIFICATIONS_ENABLED", false)?,
            email_api_url: env_opt("EMAIL_API_URL"),
            email_api_key: env_opt("EMAIL_API_KEY"),
            email_from: env_or("EMAIL_FROM", "no-reply@mizan.local".to_string())?,
            email_timeout: Duration::from_secs(env_or("EMAIL_TIMEOUT_SECS", 10)?),
            pdf_font_dir: env_or("PDF_FONT_DIR", PathBuf::from("./fonts"))?,
        })
    }
}

// O estado compartilhado: cada repositório e serviço é montado uma vez aqui.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<AppConfig>,

    pub auth_service: AuthService,
    pub user_service: UserService,
    pub office_service: OfficeService,
    pub client_service: ClientService,
    pub case_service: CaseService,
    pub court_session_service: CourtSessionService,
    pub document_service: DocumentService,
    pub invoice_service: InvoiceService,
    pub task_service: TaskService,
    pub notification_service: NotificationService,
    pub activity_service: ActivityService,
    pub dashboard_service: DashboardService,
    pub reminder_sweep: ReminderSweep,
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        Self::build(db_pool, config)
    }

    /// Monta o gráfico de dependências sobre um pool já criado.
    pub fn build(db_pool: PgPool, config: AppConfig) -> anyhow::Result<Self> {
        let transport: Arc<dyn EmailTransport> = match &config.email_api_url {
            Some(api_url) => Arc::new(HttpEmailTransport::new(
                api_url.clone(),
                config.email_api_key.clone(),
                config.email_from.clone(),
                config.email_timeout,
            )?),
            None => {
                if config.email_notifications_enabled {
                    tracing::warn!("EMAIL_API_URL ausente: e-mails só vão para o log");
                }
                Arc::new(LogEmailTransport)
            }
        };
        let mailer = EmailDispatcher::new(transport, config.email_notifications_enabled, config.email_timeout);

        let activity_service = ActivityService::new(ActivityRepository::new(), db_pool.clone());
        let notification_service = NotificationService::new(NotificationRepository::new(), db_pool.clone());

        let auth_service = AuthService::new(
            UserRepository::new(),
            OfficeRepository::new(),
            activity_service.clone(),
            config.jwt_secret.clone(),
            db_pool.clone(),
        );
        let user_service = UserService::new(UserRepository::new(), activity_service.clone());
        let office_service = OfficeService::new(OfficeRepository::new());
        let client_service = ClientService::new(ClientRepository::new(), activity_service.clone());
        let case_service = CaseService::new(
            CaseRepository::new(),
            activity_service.clone(),
            notification_service.clone(),
        );
        let court_session_service = CourtSessionService::new(CourtSessionRepository::new(), activity_service.clone());
        let document_service = DocumentService::new(DocumentRepository::new(), activity_service.clone());
        let invoice_service = InvoiceService::new(
            InvoiceRepository::new(),
            OfficeRepository::new(),
            activity_service.clone(),
            config.pdf_font_dir.clone(),
        );
        let task_service = TaskService::new(
            TaskRepository::new(),
            activity_service.clone(),
            notification_service.clone(),
        );
        let dashboard_service = DashboardService::new();
        let reminder_sweep = ReminderSweep::new(Arc::new(PgSweepStore::new(db_pool.clone())), mailer);

        Ok(Self {
            db_pool,
            config: Arc::new(config),
            auth_service,
            user_service,
            office_service,
            client_service,
            case_service,
            court_session_service,
            document_service,
            invoice_service,
            task_service,
            notification_service,
            activity_service,
            dashboard_service,
            reminder_sweep,
        })
    }
}
