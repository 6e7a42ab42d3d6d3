pub mod activity_service;
pub mod auth;
pub mod case_service;
pub mod client_service;
pub mod court_session_service;
pub mod dashboard_service;
pub mod document_service;
pub mod email;
pub mod invoice_service;
pub mod notification_service;
pub mod office_service;
pub mod references;
pub mod reminder_sweep;
pub mod task_service;
pub mod user_service;
