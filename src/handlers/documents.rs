// src/handlers/documents.rs

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
    models::document::{CreateDocumentPayload, Document, DocumentFilter, UpdateDocumentPayload},
};

// GET /api/documents
#[utoipa::path(
    get,
    path = "/api/documents",
    tag = "Documents",
    params(PageQuery, DocumentFilter),
    responses(
        (status = 200, description = "Documentos visíveis", body = Page<Document>),
        (status = 401, description = "Não autorizado"),
        (status = 403, description = "Papel sem acesso")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_documents(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Query(page): Query<PageQuery>,
    Query(filter): Query<DocumentFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let items = app_state
        .document_service
        .list(&app_state.db_pool, &user.principal(), &filter, &page)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(items)))
}

// GET /api/documents/{id}
#[utoipa::path(
    get,
    path = "/api/documents/{id}",
    tag = "Documents",
    params(("id" = Uuid, Path, description = "ID do documento")),
    responses(
        (status = 200, description = "Documento", body = Document),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_document(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let item = app_state
        .document_service
        .get(&app_state.db_pool, &user.principal(), id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(item)))
}

// POST /api/documents
#[utoipa::path(
    post,
    path = "/api/documents",
    tag = "Documents",
    request_body = CreateDocumentPayload,
    responses(
        (status = 201, description = "Documento registrado", body = Document),
        (status = 400, description = "Dados inválidos"),
        (status = 403, description = "Sem permissão")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_document(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Json(payload): Json<CreateDocumentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let created = app_state
        .document_service
        .create(&app_state.db_pool, &user.principal(), &payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(created)))
}

// PUT /api/documents/{id}
#[utoipa::path(
    put,
    path = "/api/documents/{id}",
    tag = "Documents",
    request_body = UpdateDocumentPayload,
    params(("id" = Uuid, Path, description = "ID do documento")),
    responses(
        (status = 200, description = "Documento atualizado", body = Document),
        (status = 403, description = "Sem permissão"),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_document(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateDocumentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let updated = app_state
        .document_service
        .update(&app_state.db_pool, &user.principal(), id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(updated)))
}

// DELETE /api/documents/{id}
#[utoipa::path(
    delete,
    path = "/api/documents/{id}",
    tag = "Documents",
    params(("id" = Uuid, Path, description = "ID do documento")),
    responses(
        (status = 204, description = "Documento desativado"),
        (status = 403, description = "Sem permissão"),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_document(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .document_service
        .delete(&app_state.db_pool, &user.principal(), id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(StatusCode::NO_CONTENT)
}
