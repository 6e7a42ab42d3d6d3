// src/services/task_service.rs

use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    access::{self, Action, OwnershipRow, Principal, ResourceType, Visibility},
    common::{
        db_utils::{Page, PageQuery},
        error::AppError,
    },
    db::TaskRepository,
    models::{
        activity::ActivityAction,
        notification::{NewNotification, NotificationKind},
        task::{CreateTaskPayload, Task, TaskFilter, TaskPriority, UpdateTaskPayload},
    },
    services::{
        activity_service::ActivityService, notification_service::NotificationService, references,
    },
};

#[derive(Clone)]
pub struct TaskService {
    repo: TaskRepository,
    activity: ActivityService,
    notifications: NotificationService,
}

impl TaskService {
    pub fn new(repo: TaskRepository, activity: ActivityService, notifications: NotificationService) -> Self {
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
        filter: &TaskFilter,
        page: &PageQuery,
    ) -> Result<Page<Task>, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let scope = access::scope_filter(principal, ResourceType::Task, Visibility::from_flag(page.include_inactive))?;
        let mut conn = executor.acquire().await?;

        let items = self.repo.list(&mut *conn, &scope, filter, page).await?;
        let total = self.repo.count(&mut *conn, &scope, filter).await?;

        Ok(Page::new(items, total, page))
    }

    pub async fn get<'e, E>(&self, executor: E, principal: &Principal, id: Uuid) -> Result<Task, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let task = self
            .repo
            .find_by_id(executor, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("task {}", id)))?;

        access::authorize(principal, ResourceType::Task, Action::Read, &task.ownership())?;
        Ok(task)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        payload: &CreateTaskPayload,
    ) -> Result<Task, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let office_id = access::tenant_for_create(principal, payload.office_id);
        let assigned_to = payload.assigned_to.unwrap_or(principal.user_id);

        let mut tx = executor.begin().await?;

        references::active_user(&mut tx, office_id, assigned_to).await?;

        let mut prospective = OwnershipRow {
            office_id,
            is_active: true,
            created_by: Some(principal.user_id),
            assigned_to: Some(assigned_to),
            ..Default::default()
        };
        if let Some(case_id) = payload.case_id {
            let case = references::readable_case(&mut tx, principal, case_id).await?;
            prospective.lawyer_id = Some(case.lawyer_id);
            prospective.assistant_lawyer_id = case.assistant_lawyer_id;
        }
        access::authorize(principal, ResourceType::Task, Action::Create, &prospective)?;

        let id = self
            .repo
            .create(
                &mut *tx,
                office_id,
                payload.case_id,
                &payload.title,
                payload.description.as_deref(),
                assigned_to,
                payload.due_date,
                payload.priority.unwrap_or(TaskPriority::Medium),
                principal.user_id,
            )
            .await?;

        let task = self
            .repo
            .find_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("task {}", id)))?;

        tx.commit().await?;

        self.activity.record(
            principal,
            ActivityAction::Create,
            ResourceType::Task,
            task.id,
            format!("إضافة مهمة: {}", task.title),
        );
        self.notify_assignee(principal, &task);
        Ok(task)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        id: Uuid,
        payload: &UpdateTaskPayload,
    ) -> Result<Task, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let current = self
            .repo
            .find_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("task {}", id)))?;
        access::authorize(principal, ResourceType::Task, Action::Update, &current.ownership())?;

        if let Some(assigned_to) = payload.assigned_to {
            references::active_user(&mut tx, principal.office_id, assigned_to).await?;
        }

        let scope = access::scope_filter(principal, ResourceType::Task, Visibility::ActiveOnly)?;
        if self.repo.update(&mut *tx, &scope, id, payload).await? == 0 {
            return Err(AppError::not_found(format!("task {}", id)));
        }

        let task = self
            .repo
            .find_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("task {}", id)))?;

        tx.commit().await?;

        self.activity.record(
            principal,
            ActivityAction::Update,
            ResourceType::Task,
            task.id,
            format!("تعديل المهمة: {}", task.title),
        );
        if task.assigned_to != current.assigned_to {
            self.notify_assignee(principal, &task);
        }
        Ok(task)
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
            .ok_or_else(|| AppError::not_found(format!("task {}", id)))?;
        access::authorize(principal, ResourceType::Task, Action::Delete, &current.ownership())?;

        let scope = access::scope_filter(principal, ResourceType::Task, Visibility::ActiveOnly)?;
        if self.repo.soft_delete(&mut *conn, &scope, id).await? == 0 {
            return Err(AppError::not_found(format!("task {}", id)));
        }

        self.activity.record(
            principal,
            ActivityAction::Delete,
            ResourceType::Task,
            id,
            format!("حذف المهمة: {}", current.title),
        );
        Ok(())
    }

    fn notify_assignee(&self, principal: &Principal, task: &Task) {
        if task.assigned_to == principal.user_id {
            return;
        }
        self.notifications.notify(NewNotification {
            office_id: task.office_id,
            user_id: task.assigned_to,
            title: "مهمة جديدة".into(),
            message: format!(
                "تم إسناد المهمة \"{}\" إليك، موعد التسليم {}",
                task.title,
                task.due_date.format("%Y-%m-%d %H:%M")
            ),
            kind: NotificationKind::TaskAssigned,
            related_entity_type: Some(ResourceType::Task.entity_name()),
            related_entity_id: Some(task.id),
        });
    }
}
