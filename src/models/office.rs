// src/models/office.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

// O escritório (tenant) com a identidade visual
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Office {
    pub id: Uuid,

    #[schema(example = "مكتب العدالة للمحاماة")]
    pub name: String,

    #[schema(example = "https://office.example/logo.png")]
    pub logo_url: Option<String>,

    #[schema(example = "#1F3A5F")]
    pub primary_color: Option<String>,

    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOfficePayload {
    #[validate(length(min = 2, message = "O nome do escritório é obrigatório."))]
    pub name: Option<String>,
    #[validate(url(message = "URL inválida."))]
    pub logo_url: Option<String>,
    #[validate(length(equal = 7, message = "Use o formato #RRGGBB."))]
    pub primary_color: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: Option<String>,
}
