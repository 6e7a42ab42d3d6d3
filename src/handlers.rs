pub mod activities;
pub mod auth;
pub mod cases;
pub mod clients;
pub mod dashboard;
pub mod documents;
pub mod invoices;
pub mod notifications;
pub mod office;
pub mod sessions;
pub mod tasks;
pub mod users;
