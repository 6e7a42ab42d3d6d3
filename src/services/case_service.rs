// src/services/case_service.rs

use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    access::{self, Action, OwnershipRow, Principal, ResourceType, Visibility},
    common::{
        db_utils::{Page, PageQuery},
        error::AppError,
    },
    db::CaseRepository,
    models::{
        activity::ActivityAction,
        case::{Case, CaseFilter, CaseStatus, CreateCasePayload, UpdateCasePayload},
        notification::{NewNotification, NotificationKind},
    },
    services::{
        activity_service::ActivityService, notification_service::NotificationService, references,
    },
};

#[derive(Clone)]
pub struct CaseService {
    repo: CaseRepository,
    activity: ActivityService,
    notifications: NotificationService,
}

impl CaseService {
    pub fn new(repo: CaseRepository, activity: ActivityService, notifications: NotificationService) -> Self {
        Self {
            repo,
            activity,
            notifications,
        }
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        filter: &CaseFilter,
        page: &PageQuery,
    ) -> Result<Page<Case>, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let scope = access::scope_filter(principal, ResourceType::Case, Visibility::from_flag(page.include_inactive))?;
        let mut conn = executor.acquire().await?;

        let items = self.repo.list(&mut *conn, &scope, filter, page).await?;
        let total = self.repo.count(&mut *conn, &scope, filter).await?;

        Ok(Page::new(items, total, page))
    }

    pub async fn get<'e, E>(&self, executor: E, principal: &Principal, id: Uuid) -> Result<Case, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let case = self
            .repo
            .find_by_id(executor, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("case {}", id)))?;

        access::authorize(principal, ResourceType::Case, Action::Read, &case.ownership())?;
        Ok(case)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        payload: &CreateCasePayload,
    ) -> Result<Case, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let office_id = access::tenant_for_create(principal, payload.office_id);
        // Sem advogado informado, o processo fica com quem o cria
        let lawyer_id = payload.lawyer_id.unwrap_or(principal.user_id);

        let prospective = OwnershipRow {
            office_id,
            is_active: true,
            lawyer_id: Some(lawyer_id),
            assistant_lawyer_id: payload.assistant_lawyer_id,
            created_by: Some(principal.user_id),
            client_id: Some(payload.client_id),
            ..Default::default()
        };
        access::authorize(principal, ResourceType::Case, Action::Create, &prospective)?;

        let mut tx = executor.begin().await?;

        references::active_client(&mut tx, office_id, payload.client_id).await?;
        references::active_user(&mut tx, office_id, lawyer_id).await?;
        if let Some(assistant_id) = payload.assistant_lawyer_id {
            references::active_user(&mut tx, office_id, assistant_id).await?;
        }

        let case = self
            .repo
            .create(
                &mut *tx,
                office_id,
                &payload.case_number,
                &payload.title,
                payload.description.as_deref(),
                payload.court_name.as_deref(),
                payload.case_type.as_deref(),
                payload.client_id,
                lawyer_id,
                payload.assistant_lawyer_id,
                payload.status.unwrap_or(CaseStatus::Open),
                principal.user_id,
            )
            .await?;

        tx.commit().await?;

        self.activity.record(
            principal,
            ActivityAction::Create,
            ResourceType::Case,
            case.id,
            format!("إضافة قضية: {}", case.case_number),
        );
        self.notify_team(principal, &case, format!("تم إسناد القضية {} إليك", case.case_number));
        Ok(case)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        id: Uuid,
        payload: &UpdateCasePayload,
    ) -> Result<Case, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let current = self
            .repo
            .find_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("case {}", id)))?;
        access::authorize(principal, ResourceType::Case, Action::Update, &current.ownership())?;

        if let Some(lawyer_id) = payload.lawyer_id {
            references::active_user(&mut tx, principal.office_id, lawyer_id).await?;
        }
        if let Some(Some(assistant_id)) = payload.assistant_lawyer_id {
            references::active_user(&mut tx, principal.office_id, assistant_id).await?;
        }

        let scope = access::scope_filter(principal, ResourceType::Case, Visibility::ActiveOnly)?;
        if self.repo.update(&mut *tx, &scope, id, payload).await? == 0 {
            return Err(AppError::not_found(format!("case {}", id)));
        }

        let case = self
            .repo
            .find_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("case {}", id)))?;

        tx.commit().await?;

        self.activity.record(
            principal,
            ActivityAction::Update,
            ResourceType::Case,
            case.id,
            format!("تعديل القضية: {}", case.case_number),
        );
        let message = if case.status != current.status {
            format!("تغيرت حالة القضية {} إلى {:?}", case.case_number, case.status)
        } else {
            format!("تم تحديث القضية {}", case.case_number)
        };
        self.notify_team(principal, &case, message);
        Ok(case)
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
            .ok_or_else(|| AppError::not_found(format!("case {}", id)))?;
        access::authorize(principal, ResourceType::Case, Action::Delete, &current.ownership())?;

        let scope = access::scope_filter(principal, ResourceType::Case, Visibility::ActiveOnly)?;
        if self.repo.soft_delete(&mut *conn, &scope, id).await? == 0 {
            return Err(AppError::not_found(format!("case {}", id)));
        }

        self.activity.record(
            principal,
            ActivityAction::Delete,
            ResourceType::Case,
            id,
            format!("حذف القضية: {}", current.case_number),
        );
        Ok(())
    }

    // Advogado e assistente, menos quem fez a alteração
    fn notify_team(&self, principal: &Principal, case: &Case, message: String) {
        let mut recipients = vec![case.lawyer_id];
        if let Some(assistant_id) = case.assistant_lawyer_id.filter(|a| *a != case.lawyer_id) {
            recipients.push(assistant_id);
        }

        for user_id in recipients.into_iter().filter(|u| *u != principal.user_id) {
            self.notifications.notify(NewNotification {
                office_id: case.office_id,
                user_id,
                title: "تحديث على قضية".into(),
                message: message.clone(),
                kind: NotificationKind::CaseUpdate,
                related_entity_type: Some(ResourceType::Case.entity_name()),
                related_entity_id: Some(case.id),
            });
        }
    }
}
