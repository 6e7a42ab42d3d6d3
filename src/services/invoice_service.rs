// src/services/invoice_service.rs

use std::path::{Path, PathBuf};

use chrono::Utc;
use genpdf::{elements, style, Element};
use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    access::{self, Action, OwnershipRow, Principal, ResourceType, Visibility},
    common::{
        db_utils::{Page, PageQuery},
        error::AppError,
    },
    db::{InvoiceRepository, OfficeRepository},
    models::{
        activity::ActivityAction,
        invoice::{
            CreateInvoicePayload, Invoice, InvoiceDetail, InvoiceFilter, InvoicePayment, InvoiceStatus,
            RecordPaymentPayload, UpdateInvoicePayload,
        },
        office::Office,
    },
    services::{activity_service::ActivityService, references},
};

const DEFAULT_PAYMENT_METHOD: &str = "cash";

#[derive(Clone)]
pub struct InvoiceService {
    repo: InvoiceRepository,
    office_repo: OfficeRepository,
    activity: ActivityService,
    font_dir: PathBuf,
}

impl InvoiceService {
    pub fn new(
        repo: InvoiceRepository,
        office_repo: OfficeRepository,
        activity: ActivityService,
        font_dir: PathBuf,
    ) -> Self {
        Self {
            repo,
            office_repo,
            activity,
            font_dir,
        }
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        filter: &InvoiceFilter,
        page: &PageQuery,
    ) -> Result<Page<Invoice>, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let scope = access::scope_filter(principal, ResourceType::Invoice, Visibility::from_flag(page.include_inactive))?;
        let mut conn = executor.acquire().await?;

        let items = self.repo.list(&mut *conn, &scope, filter, page).await?;
        let total = self.repo.count(&mut *conn, &scope, filter).await?;

        Ok(Page::new(items, total, page))
    }

    pub async fn get<'e, E>(&self, executor: E, principal: &Principal, id: Uuid) -> Result<InvoiceDetail, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut conn = executor.acquire().await?;

        let invoice = self.readable(&mut *conn, principal, id).await?;
        let payments = self.repo.list_payments(&mut *conn, id).await?;

        Ok(InvoiceDetail { invoice, payments })
    }

    pub async fn create<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        payload: &CreateInvoicePayload,
    ) -> Result<Invoice, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let office_id = access::tenant_for_create(principal, payload.office_id);
        let mut tx = executor.begin().await?;

        references::active_client(&mut tx, office_id, payload.client_id).await?;

        let mut prospective = OwnershipRow {
            office_id,
            is_active: true,
            created_by: Some(principal.user_id),
            client_id: Some(payload.client_id),
            ..Default::default()
        };
        if let Some(case_id) = payload.case_id {
            let case = references::readable_case(&mut tx, principal, case_id).await?;
            if case.client_id != payload.client_id {
                return Err(AppError::DataIntegrityConflict(
                    "O processo informado pertence a outro cliente.".into(),
                ));
            }
            prospective.lawyer_id = Some(case.lawyer_id);
            prospective.assistant_lawyer_id = case.assistant_lawyer_id;
        }
        access::authorize(principal, ResourceType::Invoice, Action::Create, &prospective)?;

        let id = self
            .repo
            .create(
                &mut *tx,
                office_id,
                &payload.invoice_number,
                payload.client_id,
                payload.case_id,
                payload.amount,
                payload.issue_date.unwrap_or_else(|| Utc::now().date_naive()),
                payload.due_date,
                payload.notes.as_deref(),
                principal.user_id,
            )
            .await?;

        let invoice = self
            .repo
            .find_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("invoice {}", id)))?;

        tx.commit().await?;

        self.activity.record(
            principal,
            ActivityAction::Create,
            ResourceType::Invoice,
            invoice.id,
            format!("إصدار فاتورة {} بمبلغ {}", invoice.invoice_number, invoice.amount),
        );
        Ok(invoice)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        id: Uuid,
        payload: &UpdateInvoicePayload,
    ) -> Result<Invoice, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let current = self
            .repo
            .find_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("invoice {}", id)))?;
        access::authorize(principal, ResourceType::Invoice, Action::Update, &current.ownership())?;

        let scope = access::scope_filter(principal, ResourceType::Invoice, Visibility::ActiveOnly)?;
        if payload.status == Some(InvoiceStatus::Cancelled) {
            let (_, paid, _) = self.repo.lock_amounts(&mut *tx, &scope, id).await?;
            if paid > Decimal::ZERO {
                return Err(AppError::DataIntegrityConflict(
                    "Fatura com pagamentos não pode ser cancelada.".into(),
                ));
            }
        }

        if self.repo.update(&mut *tx, &scope, id, payload).await? == 0 {
            return Err(AppError::not_found(format!("invoice {}", id)));
        }

        let invoice = self
            .repo
            .find_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("invoice {}", id)))?;

        tx.commit().await?;

        self.activity.record(
            principal,
            ActivityAction::Update,
            ResourceType::Invoice,
            invoice.id,
            format!("تعديل الفاتورة {}", invoice.invoice_number),
        );
        Ok(invoice)
    }

    pub async fn delete<'e, E>(&self, executor: E, principal: &Principal, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut conn = executor.acquire().await?;

        let current = self
            .repo
            .find_by_id(&mut *conn, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("invoice {}", id)))?;
        access::authorize(principal, ResourceType::Invoice, Action::Delete, &current.ownership())?;

        let scope = access::scope_filter(principal, ResourceType::Invoice, Visibility::ActiveOnly)?;
        if self.repo.soft_delete(&mut *conn, &scope, id).await? == 0 {
            return Err(AppError::not_found(format!("invoice {}", id)));
        }

        self.activity.record(
            principal,
            ActivityAction::Delete,
            ResourceType::Invoice,
            id,
            format!("حذف الفاتورة {}", current.invoice_number),
        );
        Ok(())
    }

    /// Registra um pagamento. A linha da fatura fica travada (FOR UPDATE)
    /// até o commit, então dois pagamentos simultâneos não passam do total.
    pub async fn record_payment<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        id: Uuid,
        payload: &RecordPaymentPayload,
    ) -> Result<InvoiceDetail, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let current = self
            .repo
            .find_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("invoice {}", id)))?;
        access::authorize(principal, ResourceType::Invoice, Action::Update, &current.ownership())?;

        // Trava e reafirma o escopo; a autorização acima leu sem lock.
        let scope = access::scope_filter(principal, ResourceType::Invoice, Visibility::ActiveOnly)?;
        let (amount, paid, status) = self.repo.lock_amounts(&mut *tx, &scope, id).await?;
        let new_paid = next_paid_amount(amount, paid, status, payload.amount)?;

        let affected = self
            .repo
            .apply_payment(&mut *tx, &scope, id, new_paid, InvoiceStatus::from_amounts(amount, new_paid))
            .await?;
        if affected == 0 {
            return Err(AppError::not_found(format!("invoice {}", id)));
        }

        let payment = self
            .repo
            .insert_payment(
                &mut *tx,
                current.office_id,
                id,
                payload.amount,
                payload.method.as_deref().unwrap_or(DEFAULT_PAYMENT_METHOD),
                payload.reference.as_deref(),
                payload.paid_at.unwrap_or_else(Utc::now),
                principal.user_id,
            )
            .await?;

        let invoice = self
            .repo
            .find_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("invoice {}", id)))?;
        let payments = self.repo.list_payments(&mut *tx, id).await?;

        tx.commit().await?;

        tracing::info!(invoice_id = %id, payment_id = %payment.id, "pagamento registrado");
        self.activity.record(
            principal,
            ActivityAction::Payment,
            ResourceType::Invoice,
            id,
            format!("تسجيل دفعة بمبلغ {} على الفاتورة {}", payment.amount, invoice.invoice_number),
        );

        Ok(InvoiceDetail { invoice, payments })
    }

    /// PDF da fatura. A renderização roda fora do runtime assíncrono.
    pub async fn generate_pdf<'e, E>(&self, executor: E, principal: &Principal, id: Uuid) -> Result<(String, Vec<u8>), AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut conn = executor.acquire().await?;

        let invoice = self.readable(&mut *conn, principal, id).await?;
        let payments = self.repo.list_payments(&mut *conn, id).await?;
        let office = self
            .office_repo
            .find_by_id(&mut *conn, invoice.office_id)
            .await?
            .ok_or_else(|| AppError::not_found("office"))?;
        drop(conn);

        let file_name = format!("{}.pdf", invoice.invoice_number);
        let font_dir = self.font_dir.clone();
        let bytes = tokio::task::spawn_blocking(move || render_invoice_pdf(&font_dir, &office, &invoice, &payments))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de PDF: {}", e))??;

        Ok((file_name, bytes))
    }

    async fn readable(
        &self,
        conn: &mut sqlx::PgConnection,
        principal: &Principal,
        id: Uuid,
    ) -> Result<Invoice, AppError> {
        let invoice = self
            .repo
            .find_by_id(conn, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("invoice {}", id)))?;

        access::authorize(principal, ResourceType::Invoice, Action::Read, &invoice.ownership())?;
        Ok(invoice)
    }
}

/// Novo valor pago, ou o motivo da recusa.
fn next_paid_amount(
    amount: Decimal,
    paid: Decimal,
    status: InvoiceStatus,
    payment: Decimal,
) -> Result<Decimal, AppError> {
    if status == InvoiceStatus::Cancelled {
        return Err(AppError::DataIntegrityConflict(
            "Não é possível registrar pagamento em fatura cancelada.".into(),
        ));
    }
    let new_paid = paid + payment;
    if new_paid > amount {
        return Err(AppError::DataIntegrityConflict(format!(
            "O pagamento excede o saldo da fatura ({}).",
            amount - paid
        )));
    }
    Ok(new_paid)
}

fn pdf_error(e: genpdf::error::Error) -> AppError {
    AppError::InternalServerError(anyhow::anyhow!("Falha ao gerar PDF: {}", e))
}

fn render_invoice_pdf(
    font_dir: &Path,
    office: &Office,
    invoice: &Invoice,
    payments: &[InvoicePayment],
) -> Result<Vec<u8>, AppError> {
    let font_family = genpdf::fonts::from_files(font_dir, "Roboto", None).map_err(|e| {
        AppError::InternalServerError(anyhow::anyhow!("Fonte não encontrada em {}: {}", font_dir.display(), e))
    })?;

    let mut doc = genpdf::Document::new(font_family);
    doc.set_title(format!("Fatura {}", invoice.invoice_number));
    let mut decorator = genpdf::SimplePageDecorator::new();
    decorator.set_margins(10);
    doc.set_page_decorator(decorator);

    // --- CABEÇALHO (identidade do escritório) ---
    doc.push(elements::Paragraph::new(office.name.clone()).styled(style::Style::new().bold().with_font_size(18)));
    for line in [&office.address, &office.phone, &office.email].into_iter().flatten() {
        doc.push(elements::Paragraph::new(line.clone()).styled(style::Style::new().with_font_size(10)));
    }

    doc.push(elements::Break::new(1.5));

    doc.push(
        elements::Paragraph::new(format!("INVOICE #{}", invoice.invoice_number))
            .styled(style::Style::new().bold().with_font_size(14)),
    );
    doc.push(elements::Paragraph::new(format!("Date: {}", invoice.issue_date.format("%d/%m/%Y"))));
    if let Some(due) = invoice.due_date {
        doc.push(elements::Paragraph::new(format!("Due: {}", due.format("%d/%m/%Y"))));
    }
    doc.push(elements::Paragraph::new(format!("Client: {}", invoice.client_name)));
    if let Some(case_number) = &invoice.case_number {
        doc.push(elements::Paragraph::new(format!("Case: {}", case_number)));
    }

    doc.push(elements::Break::new(2));

    // --- PAGAMENTOS ---
    let mut table = elements::TableLayout::new(vec![2, 2, 3]);
    table.set_cell_decorator(elements::FrameCellDecorator::new(true, true, false));

    let bold = style::Style::new().bold();
    table
        .row()
        .element(elements::Paragraph::new("Date").styled(bold))
        .element(elements::Paragraph::new("Amount").styled(bold))
        .element(elements::Paragraph::new("Method").styled(bold))
        .push()
        .map_err(pdf_error)?;

    for payment in payments {
        table
            .row()
            .element(elements::Paragraph::new(payment.paid_at.format("%d/%m/%Y").to_string()))
            .element(elements::Paragraph::new(format!("{:.2}", payment.amount)))
            .element(elements::Paragraph::new(payment.method.clone()))
            .push()
            .map_err(pdf_error)?;
    }
    doc.push(table);

    doc.push(elements::Break::new(2));

    // --- TOTAIS ---
    for (label, value) in [
        ("TOTAL", invoice.amount),
        ("PAID", invoice.paid_amount),
        ("BALANCE", invoice.balance()),
    ] {
        let mut line = elements::Paragraph::new(format!("{}: {:.2}", label, value));
        line.set_alignment(genpdf::Alignment::Right);
        doc.push(line.styled(style::Style::new().bold().with_font_size(12)));
    }

    let mut buffer = Vec::new();
    doc.render(&mut buffer).map_err(pdf_error)?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_up_to_the_balance_is_accepted() {
        let amount = Decimal::from(1000);
        let paid = Decimal::from(400);

        let new_paid = next_paid_amount(amount, paid, InvoiceStatus::PartiallyPaid, Decimal::from(600)).unwrap();
        assert_eq!(new_paid, amount);
        assert_eq!(InvoiceStatus::from_amounts(amount, new_paid), InvoiceStatus::Paid);
    }

    #[test]
    fn overpayment_is_a_conflict() {
        let result = next_paid_amount(Decimal::from(1000), Decimal::from(400), InvoiceStatus::PartiallyPaid, Decimal::from(601));
        assert!(matches!(result, Err(AppError::DataIntegrityConflict(_))));
    }

    #[test]
    fn cancelled_invoice_takes_no_payment() {
        let result = next_paid_amount(Decimal::from(1000), Decimal::ZERO, InvoiceStatus::Cancelled, Decimal::from(1));
        assert!(matches!(result, Err(AppError::DataIntegrityConflict(_))));
    }
}
