// src/db/notification_repo.rs

use sqlx::{Executor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{db_utils::PageQuery, error::AppError},
    models::notification::{NewNotification, Notification, NotificationFilter},
};

// Notificações são sempre do próprio usuário: o filtro é (escritório, usuário).
#[derive(Clone, Copy, Default)]
pub struct NotificationRepository;

impl NotificationRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn insert<'e, E>(&self, executor: E, n: &NewNotification) -> Result<Uuid, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO notifications (office_id, user_id, title, message, kind, related_entity_type, related_entity_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(n.office_id)
        .bind(n.user_id)
        .bind(&n.title)
        .bind(&n.message)
        .bind(n.kind)
        .bind(n.related_entity_type)
        .bind(n.related_entity_id)
        .fetch_one(executor)
        .await?;

        Ok(id)
    }

    fn push_filters(
        qb: &mut QueryBuilder<'_, Postgres>,
        office_id: Uuid,
        user_id: Uuid,
        filter: &NotificationFilter,
    ) {
        qb.push(" WHERE office_id = ")
            .push_bind(office_id)
            .push(" AND user_id = ")
            .push_bind(user_id);
        if filter.unread_only == Some(true) {
            qb.push(" AND is_read = FALSE");
        }
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        office_id: Uuid,
        user_id: Uuid,
        filter: &NotificationFilter,
        page: &PageQuery,
    ) -> Result<Vec<Notification>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM notifications");
        Self::push_filters(&mut qb, office_id, user_id, filter);
        qb.push(" ORDER BY created_at DESC");
        page.push_limit(&mut qb);

        let notifications = qb.build_query_as::<Notification>().fetch_all(executor).await?;
        Ok(notifications)
    }

    pub async fn count<'e, E>(
        &self,
        executor: E,
        office_id: Uuid,
        user_id: Uuid,
        filter: &NotificationFilter,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM notifications");
        Self::push_filters(&mut qb, office_id, user_id, filter);

        let total: i64 = qb.build_query_scalar().fetch_one(executor).await?;
        Ok(total)
    }

    pub async fn mark_read<'e, E>(&self, executor: E, office_id: Uuid, user_id: Uuid, id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE id = $1 AND office_id = $2 AND user_id = $3",
        )
        .bind(id)
        .bind(office_id)
        .bind(user_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn mark_all_read<'e, E>(&self, executor: E, office_id: Uuid, user_id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE WHERE office_id = $1 AND user_id = $2 AND is_read = FALSE",
        )
        .bind(office_id)
        .bind(user_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected())
    }
}
