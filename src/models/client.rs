// src/models/client.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::access::OwnershipRow;

// O cliente (موكل) do escritório. Não confundir com o papel `client`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: Uuid,
    #[schema(ignore)]
    pub office_id: Uuid,

    #[schema(example = "محمد حسن")]
    pub full_name: String,

    #[schema(example = "29801011234567")]
    pub national_id: Option<String>,

    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    pub fn ownership(&self) -> OwnershipRow {
        OwnershipRow {
            row_id: self.id,
            office_id: self.office_id,
            is_active: self.is_active,
            created_by: Some(self.created_by),
            client_id: Some(self.id),
            ..Default::default()
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientPayload {
    #[validate(length(min = 2, message = "O nome do cliente é obrigatório."))]
    pub full_name: String,
    pub national_id: Option<String>,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,

    #[serde(default)]
    #[schema(ignore)]
    pub office_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClientPayload {
    #[validate(length(min = 2, message = "O nome do cliente é obrigatório."))]
    pub full_name: Option<String>,
    pub national_id: Option<String>,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ClientFilter {
    /// Busca por nome, documento, e-mail ou telefone
    pub q: Option<String>,
}
