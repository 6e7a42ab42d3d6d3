// src/services/activity_service.rs

use sqlx::{Acquire, Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    access::{Principal, ResourceType},
    common::{
        db_utils::{Page, PageQuery},
        error::AppError,
    },
    db::ActivityRepository,
    models::activity::{Activity, ActivityAction, ActivityFilter, NewActivity},
};

#[derive(Clone)]
pub struct ActivityService {
    repo: ActivityRepository,
    pool: PgPool,
}

impl ActivityService {
    pub fn new(repo: ActivityRepository, pool: PgPool) -> Self {
        Self { repo, pool }
    }

    /// Grava em segundo plano. Auditoria nunca derruba a operação que a gerou.
    pub fn record(
        &self,
        principal: &Principal,
        action_type: ActivityAction,
        resource: ResourceType,
        entity_id: Uuid,
        description: impl Into<String>,
    ) {
        let activity = NewActivity {
            office_id: principal.office_id,
            user_id: principal.user_id,
            action_type,
            entity_type: resource.entity_name(),
            entity_id,
            description: description.into(),
        };

        let repo = self.repo;
        let pool = self.pool.clone();
        tokio::spawn(async move {
            if let Err(e) = repo.insert(&pool, &activity).await {
                tracing::warn!(
                    entity_type = activity.entity_type,
                    entity_id = %activity.entity_id,
                    "falha ao registrar atividade: {:?}",
                    e
                );
            }
        });
    }

    // Só admin (checado no handler). Linhas de entidades desativadas continuam aqui.
    pub async fn list<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        filter: &ActivityFilter,
        page: &PageQuery,
    ) -> Result<Page<Activity>, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut conn = executor.acquire().await?;

        let items = self.repo.list(&mut *conn, principal.office_id, filter, page).await?;
        let total = self.repo.count(&mut *conn, principal.office_id, filter).await?;

        Ok(Page::new(items, total, page))
    }
}
