// src/common/db_utils.rs

use serde::{Deserialize, Serialize};
use sqlx::{Postgres, QueryBuilder};
use utoipa::{IntoParams, ToSchema};

use uuid::Uuid;

use crate::access::ScopeFilter;
use crate::common::error::AppError;

pub const DEFAULT_PER_PAGE: i64 = 20;
pub const MAX_PER_PAGE: i64 = 100;

// ---
// Paginação comum a todas as listagens
// ---
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    /// Inclui linhas desativadas (só para admin).
    #[serde(default)]
    pub include_inactive: bool,
}

impl PageQuery {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn per_page(&self) -> i64 {
        self.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.per_page()
    }

    /// LIMIT/OFFSET no fim de uma query.
    pub fn push_limit(&self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(" LIMIT ").push_bind(self.per_page());
        qb.push(" OFFSET ").push_bind(self.offset());
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, query: &PageQuery) -> Self {
        Self {
            items,
            total,
            page: query.page(),
            per_page: query.per_page(),
        }
    }
}

/// Alvo de um UPDATE com o escopo reafirmado:
/// ` WHERE id IN (SELECT <id_col> FROM <from> WHERE <id_col> = $n AND <escopo>)`.
/// Uma linha fora do escopo simplesmente não é afetada.
pub fn push_scoped_target(
    qb: &mut QueryBuilder<'_, Postgres>,
    from: &str,
    id_col: &str,
    id: Uuid,
    scope: &ScopeFilter,
) {
    qb.push(" WHERE id IN (SELECT ")
        .push(id_col)
        .push(" FROM ")
        .push(from)
        .push(" WHERE ")
        .push(id_col)
        .push(" = ")
        .push_bind(id)
        .push(" AND ");
    scope.push_where(qb);
    qb.push(")");
}

/// Converte violação de chave única num erro amigável; o resto vira DatabaseError.
pub fn unique_violation(e: sqlx::Error, message: impl FnOnce() -> String) -> AppError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.is_unique_violation() {
            return AppError::UniqueConstraintViolation(message());
        }
    }
    e.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_query_clamps_values() {
        let q = PageQuery { page: Some(0), per_page: Some(1000), include_inactive: false };
        assert_eq!(q.page(), 1);
        assert_eq!(q.per_page(), MAX_PER_PAGE);
        assert_eq!(q.offset(), 0);

        let q = PageQuery { page: Some(3), per_page: None, include_inactive: false };
        assert_eq!(q.offset(), 2 * DEFAULT_PER_PAGE);
    }

    #[test]
    fn push_limit_binds_both_values() {
        let q = PageQuery { page: Some(2), per_page: Some(10), include_inactive: false };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT 1");
        q.push_limit(&mut qb);
        assert_eq!(qb.sql(), "SELECT 1 LIMIT $1 OFFSET $2");
    }

    #[test]
    fn scoped_target_reasserts_office_and_ownership() {
        use crate::access::{scope_filter, Principal, ResourceType, Role, Visibility};

        let me = Uuid::new_v4();
        let principal = Principal {
            user_id: me,
            role: Role::Lawyer,
            office_id: Uuid::new_v4(),
            client_id: None,
        };
        let scope = scope_filter(&principal, ResourceType::Case, Visibility::ActiveOnly).unwrap();

        let mut qb = QueryBuilder::<Postgres>::new("UPDATE cases SET title = ");
        qb.push_bind("x");
        push_scoped_target(&mut qb, "cases c", "c.id", Uuid::new_v4(), &scope);

        assert_eq!(
            qb.sql(),
            "UPDATE cases SET title = $1 WHERE id IN (SELECT c.id FROM cases c WHERE c.id = $2 AND \
             (c.office_id = $3 AND (c.lawyer_id = $4 OR c.assistant_lawyer_id = $5) AND c.is_active = TRUE))"
        );
    }
}
