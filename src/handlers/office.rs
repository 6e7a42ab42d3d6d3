// src/handlers/office.rs

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::office::{Office, UpdateOfficePayload},
};

// GET /api/office
#[utoipa::path(
    get,
    path = "/api/office",
    tag = "Office",
    responses((status = 200, description = "Escritório da sessão", body = Office)),
    security(("api_jwt" = []))
)]
pub async fn get_office(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let office = app_state
        .office_service
        .get(&app_state.db_pool, &user.principal())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(office)))
}

// PUT /api/office
#[utoipa::path(
    put,
    path = "/api/office",
    tag = "Office",
    request_body = UpdateOfficePayload,
    responses(
        (status = 200, description = "Identidade visual atualizada", body = Office),
        (status = 403, description = "Só administradores")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_office(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Json(payload): Json<UpdateOfficePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let office = app_state
        .office_service
        .update(&app_state.db_pool, &user.principal(), &payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(office)))
}
