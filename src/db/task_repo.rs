// src/db/task_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    access::ScopeFilter,
    common::{
        db_utils::{push_scoped_target, PageQuery},
        error::AppError,
    },
    models::task::{Task, TaskFilter, TaskPriority, UpdateTaskPayload},
};

const SELECT_TASKS: &str = r#"
    SELECT t.*, c.case_number, c.lawyer_id, c.assistant_lawyer_id
    FROM tasks t
    LEFT JOIN cases c ON c.id = t.case_id
"#;

const SCOPED_FROM: &str = "tasks t LEFT JOIN cases c ON c.id = t.case_id";

const OPEN_STATUSES: &str = "t.status IN ('pending', 'in_progress')";

#[derive(Clone, Copy, Default)]
pub struct TaskRepository;

impl TaskRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Task>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_TASKS);
        qb.push(" WHERE t.id = ").push_bind(id);

        let task = qb.build_query_as::<Task>().fetch_optional(executor).await?;
        Ok(task)
    }

    fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, scope: &ScopeFilter, filter: &TaskFilter) {
        qb.push(" WHERE ");
        scope.push_where(qb);

        if let Some(status) = filter.status {
            qb.push(" AND t.status = ").push_bind(status);
        }
        if let Some(case_id) = filter.case_id {
            qb.push(" AND t.case_id = ").push_bind(case_id);
        }
        if let Some(assigned_to) = filter.assigned_to {
            qb.push(" AND t.assigned_to = ").push_bind(assigned_to);
        }
        if filter.overdue == Some(true) {
            qb.push(" AND ").push(OPEN_STATUSES).push(" AND t.due_date < NOW()");
        }
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        scope: &ScopeFilter,
        filter: &TaskFilter,
        page: &PageQuery,
    ) -> Result<Vec<Task>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_TASKS);
        Self::push_filters(&mut qb, scope, filter);
        qb.push(" ORDER BY t.due_date ASC");
        page.push_limit(&mut qb);

        let tasks = qb.build_query_as::<Task>().fetch_all(executor).await?;
        Ok(tasks)
    }

    pub async fn count<'e, E>(&self, executor: E, scope: &ScopeFilter, filter: &TaskFilter) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM ");
        qb.push(SCOPED_FROM);
        Self::push_filters(&mut qb, scope, filter);

        let total: i64 = qb.build_query_scalar().fetch_one(executor).await?;
        Ok(total)
    }

    /// Tarefas abertas atribuídas ao usuário (dashboard), prazo mais próximo primeiro.
    pub async fn open_for_user<'e, E>(
        &self,
        executor: E,
        scope: &ScopeFilter,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Task>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_TASKS);
        qb.push(" WHERE ");
        scope.push_where(&mut qb);
        qb.push(" AND ")
            .push(OPEN_STATUSES)
            .push(" AND t.assigned_to = ")
            .push_bind(user_id)
            .push(" ORDER BY t.due_date ASC LIMIT ")
            .push_bind(limit);

        let tasks = qb.build_query_as::<Task>().fetch_all(executor).await?;
        Ok(tasks)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        office_id: Uuid,
        case_id: Option<Uuid>,
        title: &str,
        description: Option<&str>,
        assigned_to: Uuid,
        due_date: DateTime<Utc>,
        priority: TaskPriority,
        created_by: Uuid,
    ) -> Result<Uuid, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO tasks (office_id, case_id, title, description, assigned_to, due_date, priority, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(office_id)
        .bind(case_id)
        .bind(title)
        .bind(description)
        .bind(assigned_to)
        .bind(due_date)
        .bind(priority)
        .bind(created_by)
        .fetch_one(executor)
        .await?;

        Ok(id)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        scope: &ScopeFilter,
        id: Uuid,
        input: &UpdateTaskPayload,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE tasks SET updated_at = NOW()");
        if let Some(title) = &input.title {
            qb.push(", title = ").push_bind(title.clone());
        }
        if let Some(description) = &input.description {
            qb.push(", description = ").push_bind(description.clone());
        }
        if let Some(assigned_to) = input.assigned_to {
            qb.push(", assigned_to = ").push_bind(assigned_to);
        }
        if let Some(due_date) = input.due_date {
            // Novo prazo: o alerta de atraso pode disparar de novo
            qb.push(", due_date = ")
                .push_bind(due_date)
                .push(", notification_sent = FALSE");
        }
        if let Some(priority) = input.priority {
            qb.push(", priority = ").push_bind(priority);
        }
        if let Some(status) = input.status {
            qb.push(", status = ").push_bind(status);
        }
        push_scoped_target(&mut qb, SCOPED_FROM, "t.id", id, scope);

        let result = qb.build().execute(executor).await?;
        Ok(result.rows_affected())
    }

    pub async fn soft_delete<'e, E>(&self, executor: E, scope: &ScopeFilter, id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE tasks SET is_active = FALSE, updated_at = NOW()");
        push_scoped_target(&mut qb, SCOPED_FROM, "t.id", id, scope);

        let result = qb.build().execute(executor).await?;
        Ok(result.rows_affected())
    }
}
