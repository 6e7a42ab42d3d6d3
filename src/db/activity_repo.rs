// src/db/activity_repo.rs

use sqlx::{Executor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::{db_utils::PageQuery, error::AppError},
    models::activity::{Activity, ActivityFilter, NewActivity},
};

const SELECT_ACTIVITIES: &str = r#"
    SELECT a.*, u.full_name AS user_name
    FROM activities a
    LEFT JOIN users u ON u.id = a.user_id
"#;

// Log append-only: não há update nem delete aqui.
#[derive(Clone, Copy, Default)]
pub struct ActivityRepository;

impl ActivityRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn insert<'e, E>(&self, executor: E, activity: &NewActivity) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            INSERT INTO activities (office_id, user_id, action_type, entity_type, entity_id, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(activity.office_id)
        .bind(activity.user_id)
        .bind(activity.action_type)
        .bind(activity.entity_type)
        .bind(activity.entity_id)
        .bind(&activity.description)
        .execute(executor)
        .await?;
        Ok(())
    }

    fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, office_id: Uuid, filter: &ActivityFilter) {
        qb.push(" WHERE a.office_id = ").push_bind(office_id);
        if let Some(entity_type) = &filter.entity_type {
            qb.push(" AND a.entity_type = ").push_bind(entity_type.clone());
        }
        if let Some(entity_id) = filter.entity_id {
            qb.push(" AND a.entity_id = ").push_bind(entity_id);
        }
        if let Some(user_id) = filter.user_id {
            qb.push(" AND a.user_id = ").push_bind(user_id);
        }
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        office_id: Uuid,
        filter: &ActivityFilter,
        page: &PageQuery,
    ) -> Result<Vec<Activity>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_ACTIVITIES);
        Self::push_filters(&mut qb, office_id, filter);
        qb.push(" ORDER BY a.created_at DESC");
        page.push_limit(&mut qb);

        let activities = qb.build_query_as::<Activity>().fetch_all(executor).await?;
        Ok(activities)
    }

    pub async fn count<'e, E>(&self, executor: E, office_id: Uuid, filter: &ActivityFilter) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM activities a");
        Self::push_filters(&mut qb, office_id, filter);

        let total: i64 = qb.build_query_scalar().fetch_one(executor).await?;
        Ok(total)
    }
}
