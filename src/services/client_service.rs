// src/services/client_service.rs

use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    access::{self, Action, OwnershipRow, Principal, ResourceType, Visibility},
    common::{
        db_utils::{Page, PageQuery},
        error::AppError,
    },
    db::ClientRepository,
    models::{
        activity::ActivityAction,
        client::{Client, ClientFilter, CreateClientPayload, UpdateClientPayload},
    },
    services::activity_service::ActivityService,
};

#[derive(Clone)]
pub struct ClientService {
    repo: ClientRepository,
    activity: ActivityService,
}

impl ClientService {
    pub fn new(repo: ClientRepository, activity: ActivityService) -> Self {
        Self { repo, activity }
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        filter: &ClientFilter,
        page: &PageQuery,
    ) -> Result<Page<Client>, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let scope = access::scope_filter(principal, ResourceType::Client, Visibility::from_flag(page.include_inactive))?;
        let mut conn = executor.acquire().await?;

        let items = self.repo.list(&mut *conn, &scope, filter, page).await?;
        let total = self.repo.count(&mut *conn, &scope, filter).await?;

        Ok(Page::new(items, total, page))
    }

    pub async fn get<'e, E>(&self, executor: E, principal: &Principal, id: Uuid) -> Result<Client, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let client = self
            .repo
            .find_by_id(executor, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("client {}", id)))?;

        access::authorize(principal, ResourceType::Client, Action::Read, &client.ownership())?;
        Ok(client)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        payload: &CreateClientPayload,
    ) -> Result<Client, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let office_id = access::tenant_for_create(principal, payload.office_id);

        // A linha nova precisa ficar visível para quem a cria.
        let prospective = OwnershipRow {
            office_id,
            is_active: true,
            created_by: Some(principal.user_id),
            ..Default::default()
        };
        access::authorize(principal, ResourceType::Client, Action::Create, &prospective)?;

        let client = self.repo.create(executor, office_id, principal.user_id, payload).await?;

        self.activity.record(
            principal,
            ActivityAction::Create,
            ResourceType::Client,
            client.id,
            format!("إضافة موكل: {}", client.full_name),
        );
        Ok(client)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        id: Uuid,
        payload: &UpdateClientPayload,
    ) -> Result<Client, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let current = self
            .repo
            .find_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("client {}", id)))?;
        access::authorize(principal, ResourceType::Client, Action::Update, &current.ownership())?;

        let scope = access::scope_filter(principal, ResourceType::Client, Visibility::ActiveOnly)?;
        if self.repo.update(&mut *tx, &scope, id, payload).await? == 0 {
            return Err(AppError::not_found(format!("client {}", id)));
        }

        let client = self
            .repo
            .find_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("client {}", id)))?;

        tx.commit().await?;

        self.activity.record(
            principal,
            ActivityAction::Update,
            ResourceType::Client,
            client.id,
            format!("تعديل بيانات الموكل: {}", client.full_name),
        );
        Ok(client)
    }

    pub async fn delete<'e, E>(&self, executor: E, principal: &Principal, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut conn = executor.acquire().await?;

        let current = self
            .repo
            .find_by_id(&mut *conn, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("client {}", id)))?;
        access::authorize(principal, ResourceType::Client, Action::Delete, &current.ownership())?;

        let scope = access::scope_filter(principal, ResourceType::Client, Visibility::ActiveOnly)?;
        if self.repo.soft_delete(&mut *conn, &scope, id).await? == 0 {
            return Err(AppError::not_found(format!("client {}", id)));
        }

        self.activity.record(
            principal,
            ActivityAction::Delete,
            ResourceType::Client,
            id,
            format!("حذف الموكل: {}", current.full_name),
        );
        Ok(())
    }
}
