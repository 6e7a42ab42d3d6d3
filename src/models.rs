pub mod activity;
pub mod auth;
pub mod case;
pub mod client;
pub mod court_session;
pub mod dashboard;
pub mod document;
pub mod invoice;
pub mod notification;
pub mod office;
pub mod task;
