// src/db/client_repo.rs

use sqlx::{Executor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    access::ScopeFilter,
    common::{
        db_utils::{push_scoped_target, PageQuery},
        error::AppError,
    },
    models::client::{Client, ClientFilter, CreateClientPayload, UpdateClientPayload},
};

#[derive(Clone, Copy, Default)]
pub struct ClientRepository;

impl ClientRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Client>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let client = sqlx::query_as::<_, Client>("SELECT cl.* FROM clients cl WHERE cl.id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(client)
    }

    fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, scope: &ScopeFilter, filter: &ClientFilter) {
        qb.push(" WHERE ");
        scope.push_where(qb);

        if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let pattern = format!("%{}%", q);
            qb.push(" AND (cl.full_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR cl.national_id ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR cl.email ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR cl.phone ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        scope: &ScopeFilter,
        filter: &ClientFilter,
        page: &PageQuery,
    ) -> Result<Vec<Client>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT cl.* FROM clients cl");
        Self::push_filters(&mut qb, scope, filter);
        qb.push(" ORDER BY cl.full_name ASC");
        page.push_limit(&mut qb);

        let clients = qb.build_query_as::<Client>().fetch_all(executor).await?;
        Ok(clients)
    }

    pub async fn count<'e, E>(&self, executor: E, scope: &ScopeFilter, filter: &ClientFilter) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM clients cl");
        Self::push_filters(&mut qb, scope, filter);

        let total: i64 = qb.build_query_scalar().fetch_one(executor).await?;
        Ok(total)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        office_id: Uuid,
        created_by: Uuid,
        input: &CreateClientPayload,
    ) -> Result<Client, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let client = sqlx::query_as::<_, Client>(
            r#"
            INSERT INTO clients (office_id, full_name, national_id, email, phone, address, notes, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(office_id)
        .bind(&input.full_name)
        .bind(&input.national_id)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.address)
        .bind(&input.notes)
        .bind(created_by)
        .fetch_one(executor)
        .await?;

        Ok(client)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        scope: &ScopeFilter,
        id: Uuid,
        input: &UpdateClientPayload,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE clients SET updated_at = NOW()");
        let fields = [
            ("full_name", &input.full_name),
            ("national_id", &input.national_id),
            ("email", &input.email),
            ("phone", &input.phone),
            ("address", &input.address),
            ("notes", &input.notes),
        ];
        for (column, value) in fields {
            if let Some(value) = value {
                qb.push(", ").push(column).push(" = ").push_bind(value.clone());
            }
        }
        push_scoped_target(&mut qb, "clients cl", "cl.id", id, scope);

        let result = qb.build().execute(executor).await?;
        Ok(result.rows_affected())
    }

    pub async fn soft_delete<'e, E>(&self, executor: E, scope: &ScopeFilter, id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE clients SET is_active = FALSE, updated_at = NOW()");
        push_scoped_target(&mut qb, "clients cl", "cl.id", id, scope);

        let result = qb.build().execute(executor).await?;
        Ok(result.rows_affected())
    }
}
