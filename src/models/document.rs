// src/models/document.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::access::OwnershipRow;

// Metadados do documento. O upload do arquivo em si fica fora deste serviço.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: Uuid,
    #[schema(ignore)]
    pub office_id: Uuid,
    pub case_id: Uuid,
    pub title: String,
    #[schema(example = "contract.pdf")]
    pub file_name: String,
    #[schema(example = "uploads/2025/01/contract.pdf")]
    pub storage_path: String,
    pub mime_type: Option<String>,
    pub size_bytes: Option<i64>,
    pub uploaded_by: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    // --- do processo ---
    pub case_number: String,
    pub lawyer_id: Uuid,
    pub assistant_lawyer_id: Option<Uuid>,
    pub client_id: Uuid,
}

impl Document {
    pub fn ownership(&self) -> OwnershipRow {
        OwnershipRow {
            row_id: self.id,
            office_id: self.office_id,
            is_active: self.is_active,
            lawyer_id: Some(self.lawyer_id),
            assistant_lawyer_id: self.assistant_lawyer_id,
            created_by: Some(self.uploaded_by),
            assigned_to: None,
            client_id: Some(self.client_id),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentPayload {
    pub case_id: Uuid,
    #[validate(length(min = 1, message = "O título é obrigatório."))]
    pub title: String,
    #[validate(length(min = 1, message = "O nome do arquivo é obrigatório."))]
    pub file_name: String,
    #[validate(length(min = 1, message = "O caminho do arquivo é obrigatório."))]
    pub storage_path: String,
    pub mime_type: Option<String>,
    #[validate(range(min = 0, message = "Tamanho inválido."))]
    pub size_bytes: Option<i64>,

    #[serde(default)]
    #[schema(ignore)]
    pub office_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDocumentPayload {
    #[validate(length(min = 1, message = "O título é obrigatório."))]
    pub title: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DocumentFilter {
    pub case_id: Option<Uuid>,
}
