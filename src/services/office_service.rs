// src/services/office_service.rs

use sqlx::{Executor, Postgres};

use crate::{
    access::{Denial, Principal},
    common::error::AppError,
    db::OfficeRepository,
    models::office::{Office, UpdateOfficePayload},
};

#[derive(Clone)]
pub struct OfficeService {
    repo: OfficeRepository,
}

impl OfficeService {
    pub fn new(repo: OfficeRepository) -> Self {
        Self { repo }
    }

    // Sempre o escritório da sessão
    pub async fn get<'e, E>(&self, executor: E, principal: &Principal) -> Result<Office, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .find_by_id(executor, principal.office_id)
            .await?
            .ok_or_else(|| AppError::not_found("office"))
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        payload: &UpdateOfficePayload,
    ) -> Result<Office, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        if !principal.is_admin() {
            return Err(Denial::RoleForbidden.into());
        }
        let office = self.repo.update(executor, principal.office_id, payload).await?;
        tracing::info!(office_id = %office.id, "identidade visual do escritório atualizada");
        Ok(office)
    }
}
