// src/db/invoice_repo.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{Executor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    access::ScopeFilter,
    common::{
        db_utils::{push_scoped_target, unique_violation, PageQuery},
        error::AppError,
    },
    models::invoice::{Invoice, InvoiceFilter, InvoicePayment, InvoiceStatus, UpdateInvoicePayload},
};

// O processo é opcional: LEFT JOIN.
const SELECT_INVOICES: &str = r#"
    SELECT i.*, cl.full_name AS client_name,
           c.case_number, c.lawyer_id, c.assistant_lawyer_id
    FROM invoices i
    JOIN clients cl ON cl.id = i.client_id
    LEFT JOIN cases c ON c.id = i.case_id
"#;

const SCOPED_FROM: &str = "invoices i LEFT JOIN cases c ON c.id = i.case_id";

#[derive(Clone, Copy, Default)]
pub struct InvoiceRepository;

impl InvoiceRepository {
    pub fn new() -> Self {
        Self
    }

    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<Invoice>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_INVOICES);
        qb.push(" WHERE i.id = ").push_bind(id);

        let invoice = qb.build_query_as::<Invoice>().fetch_optional(executor).await?;
        Ok(invoice)
    }

    /// Trava a linha da fatura até o fim da transação (registro de pagamento).
    /// O escopo é reavaliado sobre a versão travada: fatura desativada ou
    /// reatribuída enquanto se esperava o lock volta como 404.
    pub async fn lock_amounts<'e, E>(
        &self,
        executor: E,
        scope: &ScopeFilter,
        id: Uuid,
    ) -> Result<(Decimal, Decimal, InvoiceStatus), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT i.amount, i.paid_amount, i.status FROM ");
        qb.push(SCOPED_FROM).push(" WHERE i.id = ").push_bind(id).push(" AND ");
        scope.push_where(&mut qb);
        // LEFT JOIN: só a fatura é travada
        qb.push(" FOR UPDATE OF i");

        let row = qb
            .build_query_as::<(Decimal, Decimal, InvoiceStatus)>()
            .fetch_optional(executor)
            .await?
            .ok_or_else(|| AppError::not_found(format!("invoice {}", id)))?;
        Ok(row)
    }

    fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, scope: &ScopeFilter, filter: &InvoiceFilter) {
        qb.push(" WHERE ");
        scope.push_where(qb);

        if let Some(status) = filter.status {
            qb.push(" AND i.status = ").push_bind(status);
        }
        if let Some(client_id) = filter.client_id {
            qb.push(" AND i.client_id = ").push_bind(client_id);
        }
        if let Some(case_id) = filter.case_id {
            qb.push(" AND i.case_id = ").push_bind(case_id);
        }
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        scope: &ScopeFilter,
        filter: &InvoiceFilter,
        page: &PageQuery,
    ) -> Result<Vec<Invoice>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_INVOICES);
        Self::push_filters(&mut qb, scope, filter);
        qb.push(" ORDER BY i.issue_date DESC, i.created_at DESC");
        page.push_limit(&mut qb);

        let invoices = qb.build_query_as::<Invoice>().fetch_all(executor).await?;
        Ok(invoices)
    }

    pub async fn count<'e, E>(&self, executor: E, scope: &ScopeFilter, filter: &InvoiceFilter) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM ");
        qb.push(SCOPED_FROM);
        Self::push_filters(&mut qb, scope, filter);

        let total: i64 = qb.build_query_scalar().fetch_one(executor).await?;
        Ok(total)
    }

    /// Saldo em aberto das faturas visíveis (dashboard).
    pub async fn outstanding_balance<'e, E>(&self, executor: E, scope: &ScopeFilter) -> Result<Decimal, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COALESCE(SUM(i.amount - i.paid_amount), 0) FROM ");
        qb.push(SCOPED_FROM).push(" WHERE ");
        scope.push_where(&mut qb);
        qb.push(" AND i.status IN ('unpaid', 'partially_paid')");

        let total: Decimal = qb.build_query_scalar().fetch_one(executor).await?;
        Ok(total)
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        office_id: Uuid,
        invoice_number: &str,
        client_id: Uuid,
        case_id: Option<Uuid>,
        amount: Decimal,
        issue_date: NaiveDate,
        due_date: Option<NaiveDate>,
        notes: Option<&str>,
        created_by: Uuid,
    ) -> Result<Uuid, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO invoices (
                office_id, invoice_number, client_id, case_id, amount,
                issue_date, due_date, notes, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(office_id)
        .bind(invoice_number)
        .bind(client_id)
        .bind(case_id)
        .bind(amount)
        .bind(issue_date)
        .bind(due_date)
        .bind(notes)
        .bind(created_by)
        .fetch_one(executor)
        .await
        .map_err(|e| unique_violation(e, || format!("A fatura '{}' já existe.", invoice_number)))
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        scope: &ScopeFilter,
        id: Uuid,
        input: &UpdateInvoicePayload,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE invoices SET updated_at = NOW()");
        if let Some(due_date) = input.due_date {
            qb.push(", due_date = ").push_bind(due_date);
        }
        if let Some(notes) = &input.notes {
            qb.push(", notes = ").push_bind(notes.clone());
        }
        if let Some(status) = input.status {
            qb.push(", status = ").push_bind(status);
        }
        push_scoped_target(&mut qb, SCOPED_FROM, "i.id", id, scope);

        let result = qb.build().execute(executor).await?;
        Ok(result.rows_affected())
    }

    pub async fn soft_delete<'e, E>(&self, executor: E, scope: &ScopeFilter, id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE invoices SET is_active = FALSE, updated_at = NOW()");
        push_scoped_target(&mut qb, SCOPED_FROM, "i.id", id, scope);

        let result = qb.build().execute(executor).await?;
        Ok(result.rows_affected())
    }

    // =========================================================================
    //  PAGAMENTOS
    // =========================================================================

    pub async fn insert_payment<'e, E>(
        &self,
        executor: E,
        office_id: Uuid,
        invoice_id: Uuid,
        amount: Decimal,
        method: &str,
        reference: Option<&str>,
        paid_at: DateTime<Utc>,
        recorded_by: Uuid,
    ) -> Result<InvoicePayment, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payment = sqlx::query_as::<_, InvoicePayment>(
            r#"
            INSERT INTO invoice_payments (office_id, invoice_id, amount, method, reference, paid_at, recorded_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(office_id)
        .bind(invoice_id)
        .bind(amount)
        .bind(method)
        .bind(reference)
        .bind(paid_at)
        .bind(recorded_by)
        .fetch_one(executor)
        .await?;

        Ok(payment)
    }

    pub async fn apply_payment<'e, E>(
        &self,
        executor: E,
        scope: &ScopeFilter,
        invoice_id: Uuid,
        paid_amount: Decimal,
        status: InvoiceStatus,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE invoices SET paid_amount = ");
        qb.push_bind(paid_amount)
            .push(", status = ")
            .push_bind(status)
            .push(", updated_at = NOW()");
        push_scoped_target(&mut qb, SCOPED_FROM, "i.id", invoice_id, scope);

        let result = qb.build().execute(executor).await?;
        Ok(result.rows_affected())
    }

    pub async fn list_payments<'e, E>(&self, executor: E, invoice_id: Uuid) -> Result<Vec<InvoicePayment>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let payments = sqlx::query_as::<_, InvoicePayment>(
            "SELECT * FROM invoice_payments WHERE invoice_id = $1 ORDER BY paid_at ASC",
        )
        .bind(invoice_id)
        .fetch_all(executor)
        .await?;
        Ok(payments)
    }
}
