// src/db/court_session_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    access::ScopeFilter,
    common::{
        db_utils::{push_scoped_target, PageQuery},
        error::AppError,
    },
    models::court_session::{CourtSession, CourtSessionFilter, UpdateCourtSessionPayload},
};

// A posse vem do processo: toda leitura faz JOIN com cases c.
const SELECT_SESSIONS: &str = r#"
    SELECT s.*, c.case_number, c.title AS case_title,
           c.lawyer_id, c.assistant_lawyer_id, c.client_id
    FROM court_sessions s
    JOIN cases c ON c.id = s.case_id
"#;

const SCOPED_FROM: &str = "court_sessions s JOIN cases c ON c.id = s.case_id";

#[derive(Clone, Copy, Default)]
pub struct CourtSessionRepository;

impl CourtSessionRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<CourtSession>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_SESSIONS);
        qb.push(" WHERE s.id = ").push_bind(id);

        let session = qb.build_query_as::<CourtSession>().fetch_optional(executor).await?;
        Ok(session)
    }

    fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, scope: &ScopeFilter, filter: &CourtSessionFilter) {
        qb.push(" WHERE ");
        scope.push_where(qb);

        if let Some(case_id) = filter.case_id {
            qb.push(" AND s.case_id = ").push_bind(case_id);
        }
        if let Some(status) = filter.status {
            qb.push(" AND s.status = ").push_bind(status);
        }
        if let Some(from) = filter.from {
            qb.push(" AND s.session_date >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            qb.push(" AND s.session_date <= ").push_bind(to);
        }
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        scope: &ScopeFilter,
        filter: &CourtSessionFilter,
        page: &PageQuery,
    ) -> Result<Vec<CourtSession>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_SESSIONS);
        Self::push_filters(&mut qb, scope, filter);
        qb.push(" ORDER BY s.session_date ASC");
        page.push_limit(&mut qb);

        let sessions = qb.build_query_as::<CourtSession>().fetch_all(executor).await?;
        Ok(sessions)
    }

    pub async fn count<'e, E>(
        &self,
        executor: E,
        scope: &ScopeFilter,
        filter: &CourtSessionFilter,
    ) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM ");
        qb.push(SCOPED_FROM);
        Self::push_filters(&mut qb, scope, filter);

        let total: i64 = qb.build_query_scalar().fetch_one(executor).await?;
        Ok(total)
    }

    /// Próximas sessões agendadas dentro do escopo (dashboard).
    pub async fn upcoming<'e, E>(
        &self,
        executor: E,
        scope: &ScopeFilter,
        until: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<CourtSession>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_SESSIONS);
        qb.push(" WHERE ");
        scope.push_where(&mut qb);
        qb.push(" AND s.status = 'scheduled' AND s.session_date >= NOW() AND s.session_date <= ")
            .push_bind(until)
            .push(" ORDER BY s.session_date ASC LIMIT ")
            .push_bind(limit);

        let sessions = qb.build_query_as::<CourtSession>().fetch_all(executor).await?;
        Ok(sessions)
    }

    /// Retorna só o id; a linha completa (com o JOIN) é relida depois.
    pub async fn create<'e, E>(
        &self,
        executor: E,
        office_id: Uuid,
        case_id: Uuid,
        session_date: DateTime<Utc>,
        court_name: Option<&str>,
        location: Option<&str>,
        notes: Option<&str>,
        created_by: Uuid,
    ) -> Result<Uuid, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO court_sessions (office_id, case_id, session_date, court_name, location, notes, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(office_id)
        .bind(case_id)
        .bind(session_date)
        .bind(court_name)
        .bind(location)
        .bind(notes)
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
        input: &UpdateCourtSessionPayload,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE court_sessions SET updated_at = NOW()");
        if let Some(session_date) = input.session_date {
            // Nova data: os lembretes recomeçam do zero
            qb.push(", session_date = ")
                .push_bind(session_date)
                .push(", sent_reminders = '{}'");
        }
        if let Some(court_name) = &input.court_name {
            qb.push(", court_name = ").push_bind(court_name.clone());
        }
        if let Some(location) = &input.location {
            qb.push(", location = ").push_bind(location.clone());
        }
        if let Some(notes) = &input.notes {
            qb.push(", notes = ").push_bind(notes.clone());
        }
        if let Some(status) = input.status {
            qb.push(", status = ").push_bind(status);
        }
        push_scoped_target(&mut qb, SCOPED_FROM, "s.id", id, scope);

        let result = qb.build().execute(executor).await?;
        Ok(result.rows_affected())
    }

    pub async fn soft_delete<'e, E>(&self, executor: E, scope: &ScopeFilter, id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE court_sessions SET is_active = FALSE, updated_at = NOW()");
        push_scoped_target(&mut qb, SCOPED_FROM, "s.id", id, scope);

        let result = qb.build().execute(executor).await?;
        Ok(result.rows_affected())
    }
}
