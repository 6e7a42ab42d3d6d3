pub mod activity_repo;
pub use activity_repo::ActivityRepository;
pub mod case_repo;
pub use case_repo::CaseRepository;
pub mod client_repo;
pub use client_repo::ClientRepository;
pub mod court_session_repo;
pub use court_session_repo::CourtSessionRepository;
pub mod document_repo;
pub use document_repo::DocumentRepository;
pub mod invoice_repo;
pub use invoice_repo::InvoiceRepository;
pub mod notification_repo;
pub use notification_repo::NotificationRepository;
pub mod office_repo;
pub use office_repo::OfficeRepository;
pub mod task_repo;
pub use task_repo::TaskRepository;
pub mod user_repo;
pub use user_repo::UserRepository;

// Fonte de dados da varredura de notificações
pub mod sweep_repo;
pub use sweep_repo::PgSweepStore;
