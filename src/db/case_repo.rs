// src/db/case_repo.rs

use sqlx::{Executor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    access::ScopeFilter,
    common::{
        db_utils::{push_scoped_target, unique_violation, PageQuery},
        error::AppError,
    },
    models::case::{Case, CaseFilter, CaseStatus, UpdateCasePayload},
};

const SELECT_CASES: &str = "SELECT c.* FROM cases c";

#[derive(Clone, Copy, Default)]
pub struct CaseRepository;

impl CaseRepository {
    pub fn new() -> Self {
        Self
    }

    /// Busca sem escopo. Quem chama passa a linha pelo `authorize`.
    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Case>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let case = sqlx::query_as::<_, Case>("SELECT c.* FROM cases c WHERE c.id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(case)
    }

    fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, scope: &ScopeFilter, filter: &CaseFilter) {
        qb.push(" WHERE ");
        scope.push_where(qb);

        if let Some(status) = filter.status {
            qb.push(" AND c.status = ").push_bind(status);
        }
        if let Some(client_id) = filter.client_id {
            qb.push(" AND c.client_id = ").push_bind(client_id);
        }
        if let Some(lawyer_id) = filter.lawyer_id {
            qb.push(" AND c.lawyer_id = ").push_bind(lawyer_id);
        }
        if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            let pattern = format!("%{}%", q);
            qb.push(" AND (c.case_number ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR c.title ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        scope: &ScopeFilter,
        filter: &CaseFilter,
        page: &PageQuery,
    ) -> Result<Vec<Case>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_CASES);
        Self::push_filters(&mut qb, scope, filter);
        qb.push(" ORDER BY c.created_at DESC");
        page.push_limit(&mut qb);

        let cases = qb.build_query_as::<Case>().fetch_all(executor).await?;
        Ok(cases)
    }

    pub async fn count<'e, E>(&self, executor: E, scope: &ScopeFilter, filter: &CaseFilter) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM cases c");
        Self::push_filters(&mut qb, scope, filter);

        let total: i64 = qb.build_query_scalar().fetch_one(executor).await?;
        Ok(total)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        office_id: Uuid,
        case_number: &str,
        title: &str,
        description: Option<&str>,
        court_name: Option<&str>,
        case_type: Option<&str>,
        client_id: Uuid,
        lawyer_id: Uuid,
        assistant_lawyer_id: Option<Uuid>,
        status: CaseStatus,
        created_by: Uuid,
    ) -> Result<Case, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Case>(
            r#"
            INSERT INTO cases (
                office_id, case_number, title, description, court_name, case_type,
                client_id, lawyer_id, assistant_lawyer_id, status, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING *
            "#,
        )
        .bind(office_id)
        .bind(case_number)
        .bind(title)
        .bind(description)
        .bind(court_name)
        .bind(case_type)
        .bind(client_id)
        .bind(lawyer_id)
        .bind(assistant_lawyer_id)
        .bind(status)
        .bind(created_by)
        .fetch_one(executor)
        .await
        .map_err(|e| unique_violation(e, || format!("O processo '{}' já existe.", case_number)))
    }

    /// Atualiza reafirmando o escopo no WHERE. Retorna as linhas afetadas.
    pub async fn update<'e, E>(
        &self,
        executor: E,
        scope: &ScopeFilter,
        id: Uuid,
        input: &UpdateCasePayload,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE cases SET updated_at = NOW()");
        if let Some(title) = &input.title {
            qb.push(", title = ").push_bind(title.clone());
        }
        if let Some(description) = &input.description {
            qb.push(", description = ").push_bind(description.clone());
        }
        if let Some(court_name) = &input.court_name {
            qb.push(", court_name = ").push_bind(court_name.clone());
        }
        if let Some(case_type) = &input.case_type {
            qb.push(", case_type = ").push_bind(case_type.clone());
        }
        if let Some(lawyer_id) = input.lawyer_id {
            qb.push(", lawyer_id = ").push_bind(lawyer_id);
        }
        if let Some(assistant_lawyer_id) = input.assistant_lawyer_id {
            qb.push(", assistant_lawyer_id = ").push_bind(assistant_lawyer_id);
        }
        if let Some(status) = input.status {
            qb.push(", status = ").push_bind(status);
        }
        push_scoped_target(&mut qb, "cases c", "c.id", id, scope);

        let result = qb.build().execute(executor).await?;
        Ok(result.rows_affected())
    }

    pub async fn soft_delete<'e, E>(&self, executor: E, scope: &ScopeFilter, id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE cases SET is_active = FALSE, updated_at = NOW()");
        push_scoped_target(&mut qb, "cases c", "c.id", id, scope);

        let result = qb.build().execute(executor).await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{scope_filter, Principal, ResourceType, Role, Visibility};

    #[test]
    fn list_and_count_share_the_same_where_clause() {
        let principal = Principal {
            user_id: Uuid::new_v4(),
            role: Role::Trainee,
            office_id: Uuid::new_v4(),
            client_id: None,
        };
        let scope = scope_filter(&principal, ResourceType::Case, Visibility::ActiveOnly).unwrap();
        let filter = CaseFilter {
            status: Some(CaseStatus::Open),
            q: Some("  ".into()),
            ..Default::default()
        };

        let mut list = QueryBuilder::<Postgres>::new(SELECT_CASES);
        CaseRepository::push_filters(&mut list, &scope, &filter);
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM cases c");
        CaseRepository::push_filters(&mut count, &scope, &filter);

        let list_where = list.sql().split_once(" WHERE ").map(|(_, w)| w.to_string());
        let count_where = count.sql().split_once(" WHERE ").map(|(_, w)| w.to_string());
        assert_eq!(list_where, count_where);
        assert_eq!(
            list.sql(),
            "SELECT c.* FROM cases c WHERE (c.office_id = $1 AND c.assistant_lawyer_id = $2 AND c.is_active = TRUE) AND c.status = $3"
        );
    }
}
