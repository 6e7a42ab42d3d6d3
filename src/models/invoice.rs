// src/models/invoice.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::access::OwnershipRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "invoice_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Unpaid,
    PartiallyPaid,
    Paid,
    Cancelled,
}

impl InvoiceStatus {
    /// Status derivado do valor pago. Fatura cancelada não muda.
    pub fn from_amounts(amount: Decimal, paid: Decimal) -> Self {
        if paid <= Decimal::ZERO {
            InvoiceStatus::Unpaid
        } else if paid >= amount {
            InvoiceStatus::Paid
        } else {
            InvoiceStatus::PartiallyPaid
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: Uuid,
    #[schema(ignore)]
    pub office_id: Uuid,

    #[schema(example = "INV-2025-001")]
    pub invoice_number: String,
    pub client_id: Uuid,
    pub case_id: Option<Uuid>,

    #[schema(value_type = f64, example = 1500.00)]
    pub amount: Decimal,
    #[schema(value_type = f64, example = 500.00)]
    pub paid_amount: Decimal,

    pub status: InvoiceStatus,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    // --- do cliente / processo (LEFT JOIN) ---
    pub client_name: String,
    pub case_number: Option<String>,
    pub lawyer_id: Option<Uuid>,
    pub assistant_lawyer_id: Option<Uuid>,
}

impl Invoice {
    pub fn ownership(&self) -> OwnershipRow {
        OwnershipRow {
            row_id: self.id,
            office_id: self.office_id,
            is_active: self.is_active,
            lawyer_id: self.lawyer_id,
            assistant_lawyer_id: self.assistant_lawyer_id,
            created_by: Some(self.created_by),
            assigned_to: None,
            client_id: Some(self.client_id),
        }
    }

    pub fn balance(&self) -> Decimal {
        self.amount - self.paid_amount
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoicePayment {
    pub id: Uuid,
    #[schema(ignore)]
    pub office_id: Uuid,
    pub invoice_id: Uuid,
    #[schema(value_type = f64, example = 500.00)]
    pub amount: Decimal,
    #[schema(example = "cash")]
    pub method: String,
    pub reference: Option<String>,
    pub paid_at: DateTime<Utc>,
    pub recorded_by: Uuid,
    pub created_at: DateTime<Utc>,
}

fn validate_positive(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        return Err(ValidationError::new("positive")
            .with_message("O valor deve ser maior que zero.".into()));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateInvoicePayload {
    #[validate(length(min = 1, message = "O número da fatura é obrigatório."))]
    pub invoice_number: String,
    pub client_id: Uuid,
    pub case_id: Option<Uuid>,

    #[validate(custom(function = "validate_positive"))]
    #[schema(value_type = f64, example = 1500.00)]
    pub amount: Decimal,

    // Padrão: hoje
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,

    #[serde(default)]
    #[schema(ignore)]
    pub office_id: Option<Uuid>,
}

// Os outros status são derivados dos pagamentos.
fn validate_cancel_only(status: &InvoiceStatus) -> Result<(), ValidationError> {
    if *status != InvoiceStatus::Cancelled {
        return Err(ValidationError::new("cancel_only")
            .with_message("Só é possível mudar o status para cancelled.".into()));
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInvoicePayload {
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    #[validate(custom(function = "validate_cancel_only"))]
    pub status: Option<InvoiceStatus>,
}

/// Fatura com o histórico de pagamentos (GET por id e resposta de pagamento).
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub payments: Vec<InvoicePayment>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordPaymentPayload {
    #[validate(custom(function = "validate_positive"))]
    #[schema(value_type = f64, example = 500.00)]
    pub amount: Decimal,
    pub method: Option<String>,
    pub reference: Option<String>,
    // Padrão: agora
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct InvoiceFilter {
    pub status: Option<InvoiceStatus>,
    pub client_id: Option<Uuid>,
    pub case_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_follows_paid_amount() {
        assert_eq!(InvoiceStatus::from_amounts(Decimal::from(100), Decimal::ZERO), InvoiceStatus::Unpaid);
        assert_eq!(InvoiceStatus::from_amounts(Decimal::from(100), Decimal::from(40)), InvoiceStatus::PartiallyPaid);
        assert_eq!(InvoiceStatus::from_amounts(Decimal::from(100), Decimal::from(100)), InvoiceStatus::Paid);
    }

    #[test]
    fn only_cancellation_is_accepted_as_manual_status() {
        let cancel = UpdateInvoicePayload { due_date: None, notes: None, status: Some(InvoiceStatus::Cancelled) };
        assert!(cancel.validate().is_ok());

        let paid = UpdateInvoicePayload { due_date: None, notes: None, status: Some(InvoiceStatus::Paid) };
        assert!(paid.validate().is_err());

        let untouched = UpdateInvoicePayload { due_date: None, notes: Some("x".into()), status: None };
        assert!(untouched.validate().is_ok());
    }

    #[test]
    fn payment_amount_must_be_positive() {
        let payment = RecordPaymentPayload { amount: Decimal::ZERO, method: None, reference: None, paid_at: None };
        assert!(payment.validate().is_err());
    }
}
