// src/services/document_service.rs

// Só metadados: os bytes do arquivo ficam no storage, fora daqui.

use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    access::{self, Action, Principal, ResourceType, Visibility},
    common::{
        db_utils::{Page, PageQuery},
        error::AppError,
    },
    db::DocumentRepository,
    models::{
        activity::ActivityAction,
        document::{CreateDocumentPayload, Document, DocumentFilter, UpdateDocumentPayload},
    },
    services::{activity_service::ActivityService, court_session_service::child_of_case, references},
};

#[derive(Clone)]
pub struct DocumentService {
    repo: DocumentRepository,
    activity: ActivityService,
}

impl DocumentService {
    pub fn new(repo: DocumentRepository, activity: ActivityService) -> Self {
        Self { repo, activity }
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        filter: &DocumentFilter,
        page: &PageQuery,
    ) -> Result<Page<Document>, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let scope = access::scope_filter(principal, ResourceType::Document, Visibility::from_flag(page.include_inactive))?;
        let mut conn = executor.acquire().await?;

        let items = self.repo.list(&mut *conn, &scope, filter, page).await?;
        let total = self.repo.count(&mut *conn, &scope, filter).await?;

        Ok(Page::new(items, total, page))
    }

    pub async fn get<'e, E>(&self, executor: E, principal: &Principal, id: Uuid) -> Result<Document, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let document = self
            .repo
            .find_by_id(executor, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("document {}", id)))?;

        access::authorize(principal, ResourceType::Document, Action::Read, &document.ownership())?;
        Ok(document)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        payload: &CreateDocumentPayload,
    ) -> Result<Document, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let office_id = access::tenant_for_create(principal, payload.office_id);
        let mut tx = executor.begin().await?;

        let case = references::readable_case(&mut tx, principal, payload.case_id).await?;
        access::authorize(
            principal,
            ResourceType::Document,
            Action::Create,
            &child_of_case(&case, principal.user_id),
        )?;

        let id = self.repo.create(&mut *tx, office_id, principal.user_id, payload).await?;
        let document = self
            .repo
            .find_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("document {}", id)))?;

        tx.commit().await?;

        self.activity.record(
            principal,
            ActivityAction::Create,
            ResourceType::Document,
            document.id,
            format!("رفع مستند '{}' للقضية {}", document.title, document.case_number),
        );
        Ok(document)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        id: Uuid,
        payload: &UpdateDocumentPayload,
    ) -> Result<Document, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let current = self
            .repo
            .find_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("document {}", id)))?;
        access::authorize(principal, ResourceType::Document, Action::Update, &current.ownership())?;

        let scope = access::scope_filter(principal, ResourceType::Document, Visibility::ActiveOnly)?;
        if self.repo.update(&mut *tx, &scope, id, payload).await? == 0 {
            return Err(AppError::not_found(format!("document {}", id)));
        }

        let document = self
            .repo
            .find_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("document {}", id)))?;

        tx.commit().await?;

        self.activity.record(
            principal,
            ActivityAction::Update,
            ResourceType::Document,
            document.id,
            format!("تعديل المستند: {}", document.title),
        );
        Ok(document)
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
            .ok_or_else(|| AppError::not_found(format!("document {}", id)))?;
        access::authorize(principal, ResourceType::Document, Action::Delete, &current.ownership())?;

        let scope = access::scope_filter(principal, ResourceType::Document, Visibility::ActiveOnly)?;
        if self.repo.soft_delete(&mut *conn, &scope, id).await? == 0 {
            return Err(AppError::not_found(format!("document {}", id)));
        }

        self.activity.record(
            principal,
            ActivityAction::Delete,
            ResourceType::Document,
            id,
            format!("حذف المستند: {}", current.title),
        );
        Ok(())
    }
}
