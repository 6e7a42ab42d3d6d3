// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;
use utoipa::{IntoParams, ToSchema};

use crate::access::{OwnershipRow, Principal, Role};

// Representa um usuário vindo do banco de dados
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub office_id: Uuid,

    #[schema(example = "lawyer@office.com")]
    pub email: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    #[schema(ignore)]
    pub password_hash: String,

    #[schema(example = "أحمد علي")]
    pub full_name: String,
    pub phone: Option<String>,
    pub role: Role,

    // Supervisor (estagiários)
    pub supervisor_id: Option<Uuid>,

    // Vínculo do usuário com papel `client` a um registro de cliente
    pub client_id: Option<Uuid>,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn principal(&self) -> Principal {
        Principal {
            user_id: self.id,
            role: self.role,
            office_id: self.office_id,
            client_id: self.client_id,
        }
    }

    pub fn ownership(&self) -> OwnershipRow {
        OwnershipRow {
            row_id: self.id,
            office_id: self.office_id,
            is_active: self.is_active,
            ..Default::default()
        }
    }
}

// Registro: cria o escritório e o primeiro admin
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterOfficePayload {
    #[validate(length(min = 2, message = "O nome do escritório é obrigatório."))]
    #[schema(example = "مكتب العدالة للمحاماة")]
    pub office_name: String,

    #[validate(length(min = 2, message = "O nome é obrigatório."))]
    pub full_name: String,

    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,

    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,
}

// Dados para login
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginUserPayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,
    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,
}

// Convite de usuário pelo admin
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserPayload {
    #[validate(email(message = "O e-mail fornecido é inválido."))]
    pub email: String,

    #[validate(length(min = 6, message = "A senha deve ter no mínimo 6 caracteres."))]
    pub password: String,

    #[validate(length(min = 2, message = "O nome é obrigatório."))]
    pub full_name: String,

    pub phone: Option<String>,

    #[schema(example = "lawyer")]
    pub role: Role,

    pub supervisor_id: Option<Uuid>,
    pub client_id: Option<Uuid>,

    // Ignorado: o escritório vem da sessão.
    #[serde(default)]
    #[schema(ignore)]
    pub office_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserPayload {
    #[validate(length(min = 2, message = "O nome é obrigatório."))]
    pub full_name: Option<String>,
    pub phone: Option<String>,

    // Campos abaixo: só admin
    pub role: Option<Role>,
    pub supervisor_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub is_active: Option<bool>,
}

impl UpdateUserPayload {
    pub fn touches_admin_fields(&self) -> bool {
        self.role.is_some()
            || self.supervisor_id.is_some()
            || self.client_id.is_some()
            || self.is_active.is_some()
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct UserFilter {
    pub role: Option<Role>,
}

// Resposta de autenticação com o token
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,       // Subject (ID do usuário)
    pub office: Uuid,    // Escritório no momento da emissão
    pub exp: usize,      // Expiration time
    pub iat: usize,      // Issued At
}
