use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::access::Denial;
use crate::middleware::i18n::Locale;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Registro duplicado: {0}")]
    UniqueConstraintViolation(String),

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Acesso negado: {0}")]
    AccessDenied(#[from] Denial),

    #[error("Recurso não encontrado: {0}")]
    ResourceNotFound(String),

    #[error("Conflito de integridade: {0}")]
    DataIntegrityConflict(String),

    // Falha de envio (e-mail/notificação). O sweep só registra no log.
    #[error("Falha de envio: {0}")]
    DispatchFailure(String),

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::ResourceNotFound(what.into())
    }

    /// Status HTTP. Outro escritório e linha desativada viram 404 para
    /// não revelar que a linha existe.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::EmailAlreadyExists
            | AppError::UniqueConstraintViolation(_)
            | AppError::DataIntegrityConflict(_) => StatusCode::CONFLICT,
            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::AccessDenied(Denial::CrossTenant | Denial::Inactive) => StatusCode::NOT_FOUND,
            AppError::AccessDenied(_) => StatusCode::FORBIDDEN,
            AppError::ResourceNotFound(_) => StatusCode::NOT_FOUND,
            AppError::DispatchFailure(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self, lang: &str) -> String {
        let ar = lang == "ar";
        let text = match self {
            AppError::ValidationError(_) => {
                if ar { "حقل واحد أو أكثر غير صالح." } else { "One or more fields are invalid." }
            }
            AppError::EmailAlreadyExists => {
                if ar { "البريد الإلكتروني مستخدم بالفعل." } else { "This e-mail is already in use." }
            }
            AppError::UniqueConstraintViolation(detail) | AppError::DataIntegrityConflict(detail) => {
                return detail.clone();
            }
            AppError::InvalidCredentials => {
                if ar { "البريد الإلكتروني أو كلمة المرور غير صحيحة." } else { "Invalid e-mail or password." }
            }
            AppError::InvalidToken => {
                if ar { "يجب تسجيل الدخول." } else { "You must log in." }
            }
            AppError::AccessDenied(Denial::CrossTenant | Denial::Inactive) | AppError::ResourceNotFound(_) => {
                if ar { "العنصر المطلوب غير موجود." } else { "Resource not found." }
            }
            AppError::AccessDenied(Denial::MissingClientLink) => {
                if ar { "حسابك غير مرتبط بأي موكل." } else { "Your account is not linked to a client." }
            }
            AppError::AccessDenied(_) => {
                if ar { "ليس لديك صلاحية لتنفيذ هذا الإجراء." } else { "You are not allowed to perform this action." }
            }
            AppError::DispatchFailure(_) => {
                if ar { "تعذر إرسال الإشعار." } else { "Notification could not be delivered." }
            }
            _ => {
                if ar { "حدث خطأ غير متوقع." } else { "An unexpected error occurred." }
            }
        };
        text.to_string()
    }

    pub fn to_api_error(&self, locale: &Locale) -> ApiError {
        let status = self.status();

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Erro Interno do Servidor: {:?}", self);
        } else if let AppError::AccessDenied(denial) = self {
            tracing::debug!(?denial, "acesso negado");
        }

        let details = match self {
            AppError::ValidationError(errors) => {
                let mut details = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), json!(messages));
                }
                Some(Value::Object(details))
            }
            _ => None,
        };

        ApiError {
            status,
            error: self.message(&locale.0),
            details,
        }
    }
}

// Resposta de erro já traduzida.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => json!({ "error": self.error, "details": details }),
            None => json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.to_api_error(&Locale::default()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_tenant_is_reported_as_not_found() {
        assert_eq!(AppError::AccessDenied(Denial::CrossTenant).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::AccessDenied(Denial::Inactive).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::not_found("case").status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn same_office_denials_are_forbidden() {
        for denial in [Denial::NotOwner, Denial::RoleForbidden, Denial::MissingClientLink] {
            assert_eq!(AppError::AccessDenied(denial).status(), StatusCode::FORBIDDEN);
        }
    }

    #[test]
    fn cross_tenant_and_missing_rows_render_the_same_body() {
        let locale = Locale("en".into());
        let a = AppError::AccessDenied(Denial::CrossTenant).to_api_error(&locale);
        let b = AppError::not_found("case 42").to_api_error(&locale);
        assert_eq!(a.status, b.status);
        assert_eq!(a.error, b.error);
    }

    #[test]
    fn integrity_conflict_is_409_with_detail() {
        let err = AppError::DataIntegrityConflict("payment exceeds balance".into());
        let api = err.to_api_error(&Locale("ar".into()));
        assert_eq!(api.status, StatusCode::CONFLICT);
        assert_eq!(api.error, "payment exceeds balance");
    }
}
