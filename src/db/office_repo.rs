// src/db/office_repo.rs

use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::office::{Office, UpdateOfficePayload},
};

#[derive(Clone, Copy, Default)]
pub struct OfficeRepository;

impl OfficeRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn create<'e, E>(&self, executor: E, name: &str) -> Result<Office, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let office = sqlx::query_as::<_, Office>("INSERT INTO offices (name) VALUES ($1) RETURNING *")
            .bind(name)
            .fetch_one(executor)
            .await?;
        Ok(office)
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Office>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let office = sqlx::query_as::<_, Office>("SELECT * FROM offices WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(office)
    }

    // Campos ausentes mantêm o valor atual
    pub async fn update<'e, E>(
        &self,
        executor: E,
        id: Uuid,
        input: &UpdateOfficePayload,
    ) -> Result<Office, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let office = sqlx::query_as::<_, Office>(
            r#"
            UPDATE offices SET
                name = COALESCE($2, name),
                logo_url = COALESCE($3, logo_url),
                primary_color = COALESCE($4, primary_color),
                address = COALESCE($5, address),
                phone = COALESCE($6, phone),
                email = COALESCE($7, email),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(&input.logo_url)
        .bind(&input.primary_color)
        .bind(&input.address)
        .bind(&input.phone)
        .bind(&input.email)
        .fetch_optional(executor)
        .await?
        .ok_or_else(|| AppError::not_found("office"))?;

        Ok(office)
    }
}
