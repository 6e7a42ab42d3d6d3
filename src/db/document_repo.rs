// src/db/document_repo.rs

use sqlx::{Executor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    access::ScopeFilter,
    common::{
        db_utils::{push_scoped_target, PageQuery},
        error::AppError,
    },
    models::document::{CreateDocumentPayload, Document, DocumentFilter, UpdateDocumentPayload},
};

const SELECT_DOCUMENTS: &str = r#"
    SELECT d.*, c.case_number, c.lawyer_id, c.assistant_lawyer_id, c.client_id
    FROM documents d
    JOIN cases c ON c.id = d.case_id
"#;

const SCOPED_FROM: &str = "documents d JOIN cases c ON c.id = d.case_id";

#[derive(Clone, Copy, Default)]
pub struct DocumentRepository;

impl DocumentRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Document>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_DOCUMENTS);
        qb.push(" WHERE d.id = ").push_bind(id);

        let document = qb.build_query_as::<Document>().fetch_optional(executor).await?;
        Ok(document)
    }

    fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, scope: &ScopeFilter, filter: &DocumentFilter) {
        qb.push(" WHERE ");
        scope.push_where(qb);

        if let Some(case_id) = filter.case_id {
            qb.push(" AND d.case_id = ").push_bind(case_id);
        }
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        scope: &ScopeFilter,
        filter: &DocumentFilter,
        page: &PageQuery,
    ) -> Result<Vec<Document>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_DOCUMENTS);
        Self::push_filters(&mut qb, scope, filter);
        qb.push(" ORDER BY d.created_at DESC");
        page.push_limit(&mut qb);

        let documents = qb.build_query_as::<Document>().fetch_all(executor).await?;
        Ok(documents)
    }

    pub async fn count<'e, E>(&self, executor: E, scope: &ScopeFilter, filter: &DocumentFilter) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM ");
        qb.push(SCOPED_FROM);
        Self::push_filters(&mut qb, scope, filter);

        let total: i64 = qb.build_query_scalar().fetch_one(executor).await?;
        Ok(total)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        office_id: Uuid,
        uploaded_by: Uuid,
        input: &CreateDocumentPayload,
    ) -> Result<Uuid, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO documents (office_id, case_id, title, file_name, storage_path, mime_type, size_bytes, uploaded_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(office_id)
        .bind(input.case_id)
        .bind(&input.title)
        .bind(&input.file_name)
        .bind(&input.storage_path)
        .bind(&input.mime_type)
        .bind(input.size_bytes)
        .bind(uploaded_by)
        .fetch_one(executor)
        .await?;

        Ok(id)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        scope: &ScopeFilter,
        id: Uuid,
        input: &UpdateDocumentPayload,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE documents SET updated_at = NOW()");
        if let Some(title) = &input.title {
            qb.push(", title = ").push_bind(title.clone());
        }
        push_scoped_target(&mut qb, SCOPED_FROM, "d.id", id, scope);

        let result = qb.build().execute(executor).await?;
        Ok(result.rows_affected())
    }

    pub async fn soft_delete<'e, E>(&self, executor: E, scope: &ScopeFilter, id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE documents SET is_active = FALSE, updated_at = NOW()");
        push_scoped_target(&mut qb, SCOPED_FROM, "d.id", id, scope);

        let result = qb.build().execute(executor).await?;
        Ok(result.rows_affected())
    }
}
