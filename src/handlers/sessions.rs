// src/handlers/sessions.rs

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
    models::court_session::{CreateCourtSessionPayload, CourtSession, CourtSessionFilter, UpdateCourtSessionPayload},
};

// GET /api/sessions
#[utoipa::path(
    get,
    path = "/api/sessions",
    tag = "Court sessions",
    params(PageQuery, CourtSessionFilter),
    responses(
        (status = 200, description = "Sessões visíveis", body = Page<CourtSession>),
        (status = 401, description = "Não autorizado"),
        (status = 403, description = "Papel sem acesso")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_sessions(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Query(page): Query<PageQuery>,
    Query(filter): Query<CourtSessionFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let items = app_state
        .court_session_service
        .list(&app_state.db_pool, &user.principal(), &filter, &page)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(items)))
}

// GET /api/sessions/{id}
#[utoipa::path(
    get,
    path = "/api/sessions/{id}",
    tag = "Court sessions",
    params(("id" = Uuid, Path, description = "ID da sessão")),
    responses(
        (status = 200, description = "Sessão", body = CourtSession),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_session(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let item = app_state
        .court_session_service
        .get(&app_state.db_pool, &user.principal(), id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(item)))
}

// POST /api/sessions
#[utoipa::path(
    post,
    path = "/api/sessions",
    tag = "Court sessions",
    request_body = CreateCourtSessionPayload,
    responses(
        (status = 201, description = "Sessão agendada", body = CourtSession),
        (status = 400, description = "Dados inválidos"),
        (status = 403, description = "Sem permissão")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_session(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Json(payload): Json<CreateCourtSessionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let created = app_state
        .court_session_service
        .create(&app_state.db_pool, &user.principal(), &payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(created)))
}

// PUT /api/sessions/{id}
#[utoipa::path(
    put,
    path = "/api/sessions/{id}",
    tag = "Court sessions",
    request_body = UpdateCourtSessionPayload,
    params(("id" = Uuid, Path, description = "ID da sessão")),
    responses(
        (status = 200, description = "Sessão atualizada", body = CourtSession),
        (status = 403, description = "Sem permissão"),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_session(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCourtSessionPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let updated = app_state
        .court_session_service
        .update(&app_state.db_pool, &user.principal(), id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(updated)))
}

// DELETE /api/sessions/{id}
#[utoipa::path(
    delete,
    path = "/api/sessions/{id}",
    tag = "Court sessions",
    params(("id" = Uuid, Path, description = "ID da sessão")),
    responses(
        (status = 204, description = "Sessão desativada"),
        (status = 403, description = "Sem permissão"),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_session(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .court_session_service
        .delete(&app_state.db_pool, &user.principal(), id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(StatusCode::NO_CONTENT)
}
