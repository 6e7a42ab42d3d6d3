// src/services/references.rs

// Checagens de ids informados pelo cliente num create/update.
// Id de outro escritório responde como inexistente.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::{
    access::{self, Action, Principal, ResourceType},
    common::error::AppError,
    db::{CaseRepository, ClientRepository, UserRepository},
    models::{auth::User, case::Case, client::Client},
};

pub async fn active_user(conn: &mut PgConnection, office_id: Uuid, user_id: Uuid) -> Result<User, AppError> {
    UserRepository::new()
        .find_active_in_office(conn, office_id, user_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("user {}", user_id)))
}

pub async fn active_client(conn: &mut PgConnection, office_id: Uuid, client_id: Uuid) -> Result<Client, AppError> {
    ClientRepository::new()
        .find_by_id(conn, client_id)
        .await?
        .filter(|c| c.office_id == office_id && c.is_active)
        .ok_or_else(|| AppError::not_found(format!("client {}", client_id)))
}

/// O processo pai precisa estar visível para quem cria o filho.
pub async fn readable_case(conn: &mut PgConnection, principal: &Principal, case_id: Uuid) -> Result<Case, AppError> {
    let case = CaseRepository::new()
        .find_by_id(conn, case_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("case {}", case_id)))?;

    access::authorize(principal, ResourceType::Case, Action::Read, &case.ownership())?;

    if !case.is_active {
        return Err(AppError::not_found(format!("case {}", case_id)));
    }
    Ok(case)
}
