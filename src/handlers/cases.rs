// src/handlers/cases.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::{
        db_utils::{Page, PageQuery},
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::case::{CreateCasePayload, Case, CaseFilter, UpdateCasePayload},
};

// GET /api/cases
#[utoipa::path(
    get,
    path = "/api/cases",
    tag = "Cases",
    params(PageQuery, CaseFilter),
    responses(
        (status = 200, description = "Processos visíveis", body = Page<Case>),
        (status = 401, description = "Não autorizado"),
        (status = 403, description = "Papel sem acesso")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_cases(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Query(page): Query<PageQuery>,
    Query(filter): Query<CaseFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let items = app_state
        .case_service
        .list(&app_state.db_pool, &user.principal(), &filter, &page)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(items)))
}

// GET /api/cases/{id}
#[utoipa::path(
    get,
    path = "/api/cases/{id}",
    tag = "Cases",
    params(("id" = Uuid, Path, description = "ID do processo")),
    responses(
        (status = 200, description = "Processo", body = Case),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_case(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let item = app_state
        .case_service
        .get(&app_state.db_pool, &user.principal(), id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(item)))
}

// POST /api/cases
#[utoipa::path(
    post,
    path = "/api/cases",
    tag = "Cases",
    request_body = CreateCasePayload,
    responses(
        (status = 201, description = "Processo criado", body = Case),
        (status = 400, description = "Dados inválidos"),
        (status = 403, description = "Sem permissão")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_case(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Json(payload): Json<CreateCasePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let created = app_state
        .case_service
        .create(&app_state.db_pool, &user.principal(), &payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(created)))
}

// PUT /api/cases/{id}
#[utoipa::path(
    put,
    path = "/api/cases/{id}",
    tag = "Cases",
    request_body = UpdateCasePayload,
    params(("id" = Uuid, Path, description = "ID do processo")),
    responses(
        (status = 200, description = "Processo atualizado", body = Case),
        (status = 403, description = "Sem permissão"),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_case(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCasePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let updated = app_state
        .case_service
        .update(&app_state.db_pool, &user.principal(), id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(updated)))
}

// DELETE /api/cases/{id}
#[utoipa::path(
    delete,
    path = "/api/cases/{id}",
    tag = "Cases",
    params(("id" = Uuid, Path, description = "ID do processo")),
    responses(
        (status = 204, description = "Processo desativado"),
        (status = 403, description = "Sem permissão"),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_case(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .case_service
        .delete(&app_state.db_pool, &user.principal(), id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(StatusCode::NO_CONTENT)
}
