// src/services/court_session_service.rs

use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    access::{self, Action, OwnershipRow, Principal, ResourceType, Visibility},
    common::{
        db_utils::{Page, PageQuery},
        error::AppError,
    },
    db::CourtSessionRepository,
    models::{
        activity::ActivityAction,
        case::Case,
        court_session::{CourtSession, CourtSessionFilter, CreateCourtSessionPayload, UpdateCourtSessionPayload},
    },
    services::{activity_service::ActivityService, references},
};

#[derive(Clone)]
pub struct CourtSessionService {
    repo: CourtSessionRepository,
    activity: ActivityService,
}

/// Posse de um filho novo do processo: herda advogado, assistente e cliente.
pub(crate) fn child_of_case(case: &Case, created_by: Uuid) -> OwnershipRow {
    OwnershipRow {
        office_id: case.office_id,
        is_active: true,
        lawyer_id: Some(case.lawyer_id),
        assistant_lawyer_id: case.assistant_lawyer_id,
        created_by: Some(created_by),
        client_id: Some(case.client_id),
        ..Default::default()
    }
}

impl CourtSessionService {
    pub fn new(repo: CourtSessionRepository, activity: ActivityService) -> Self {
        Self { repo, activity }
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        filter: &CourtSessionFilter,
        page: &PageQuery,
    ) -> Result<Page<CourtSession>, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let scope = access::scope_filter(
            principal,
            ResourceType::CourtSession,
            Visibility::from_flag(page.include_inactive),
        )?;
        let mut conn = executor.acquire().await?;

        let items = self.repo.list(&mut *conn, &scope, filter, page).await?;
        let total = self.repo.count(&mut *conn, &scope, filter).await?;

        Ok(Page::new(items, total, page))
    }

    pub async fn get<'e, E>(&self, executor: E, principal: &Principal, id: Uuid) -> Result<CourtSession, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let session = self
            .repo
            .find_by_id(executor, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("session {}", id)))?;

        access::authorize(principal, ResourceType::CourtSession, Action::Read, &session.ownership())?;
        Ok(session)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        payload: &CreateCourtSessionPayload,
    ) -> Result<CourtSession, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let office_id = access::tenant_for_create(principal, payload.office_id);
        let mut tx = executor.begin().await?;

        let case = references::readable_case(&mut tx, principal, payload.case_id).await?;
        access::authorize(
            principal,
            ResourceType::CourtSession,
            Action::Create,
            &child_of_case(&case, principal.user_id),
        )?;

        // Sem tribunal informado, vale o do processo
        let court_name = payload.court_name.as_deref().or(case.court_name.as_deref());

        let id = self
            .repo
            .create(
                &mut *tx,
                office_id,
                case.id,
                payload.session_date,
                court_name,
                payload.location.as_deref(),
                payload.notes.as_deref(),
                principal.user_id,
            )
            .await?;

        let session = self
            .repo
            .find_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("session {}", id)))?;

        tx.commit().await?;

        self.activity.record(
            principal,
            ActivityAction::Create,
            ResourceType::CourtSession,
            session.id,
            format!(
                "إضافة جلسة للقضية {} بتاريخ {}",
                session.case_number,
                session.session_date.format("%Y-%m-%d %H:%M")
            ),
        );
        Ok(session)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        id: Uuid,
        payload: &UpdateCourtSessionPayload,
    ) -> Result<CourtSession, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let current = self
            .repo
            .find_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("session {}", id)))?;
        access::authorize(principal, ResourceType::CourtSession, Action::Update, &current.ownership())?;

        let scope = access::scope_filter(principal, ResourceType::CourtSession, Visibility::ActiveOnly)?;
        if self.repo.update(&mut *tx, &scope, id, payload).await? == 0 {
            return Err(AppError::not_found(format!("session {}", id)));
        }

        let session = self
            .repo
            .find_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("session {}", id)))?;

        tx.commit().await?;

        self.activity.record(
            principal,
            ActivityAction::Update,
            ResourceType::CourtSession,
            session.id,
            format!("تعديل جلسة القضية {}", session.case_number),
        );
        Ok(session)
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
            .ok_or_else(|| AppError::not_found(format!("session {}", id)))?;
        access::authorize(principal, ResourceType::CourtSession, Action::Delete, &current.ownership())?;

        let scope = access::scope_filter(principal, ResourceType::CourtSession, Visibility::ActiveOnly)?;
        if self.repo.soft_delete(&mut *conn, &scope, id).await? == 0 {
            return Err(AppError::not_found(format!("session {}", id)));
        }

        self.activity.record(
            principal,
            ActivityAction::Delete,
            ResourceType::CourtSession,
            id,
            format!("حذف جلسة القضية {}", current.case_number),
        );
        Ok(())
    }
}
