// src/handlers/invoices.rs

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
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
    models::invoice::{
        CreateInvoicePayload, Invoice, InvoiceDetail, InvoiceFilter, RecordPaymentPayload, UpdateInvoicePayload,
    },
};

// GET /api/invoices
#[utoipa::path(
    get,
    path = "/api/invoices",
    tag = "Invoices",
    params(PageQuery, InvoiceFilter),
    responses(
        (status = 200, description = "Faturas visíveis", body = Page<Invoice>),
        (status = 401, description = "Não autorizado"),
        (status = 403, description = "Papel sem acesso")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_invoices(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Query(page): Query<PageQuery>,
    Query(filter): Query<InvoiceFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let items = app_state
        .invoice_service
        .list(&app_state.db_pool, &user.principal(), &filter, &page)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(items)))
}

// GET /api/invoices/{id}
#[utoipa::path(
    get,
    path = "/api/invoices/{id}",
    tag = "Invoices",
    params(("id" = Uuid, Path, description = "ID da fatura")),
    responses(
        (status = 200, description = "Fatura com pagamentos", body = InvoiceDetail),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_invoice(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let item = app_state
        .invoice_service
        .get(&app_state.db_pool, &user.principal(), id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(item)))
}

// POST /api/invoices
#[utoipa::path(
    post,
    path = "/api/invoices",
    tag = "Invoices",
    request_body = CreateInvoicePayload,
    responses(
        (status = 201, description = "Fatura emitida", body = Invoice),
        (status = 400, description = "Dados inválidos"),
        (status = 403, description = "Sem permissão")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_invoice(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Json(payload): Json<CreateInvoicePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let created = app_state
        .invoice_service
        .create(&app_state.db_pool, &user.principal(), &payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(created)))
}

// PUT /api/invoices/{id}
#[utoipa::path(
    put,
    path = "/api/invoices/{id}",
    tag = "Invoices",
    request_body = UpdateInvoicePayload,
    params(("id" = Uuid, Path, description = "ID da fatura")),
    responses(
        (status = 200, description = "Fatura atualizada", body = Invoice),
        (status = 403, description = "Sem permissão"),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_invoice(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateInvoicePayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let updated = app_state
        .invoice_service
        .update(&app_state.db_pool, &user.principal(), id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(updated)))
}

// DELETE /api/invoices/{id}
#[utoipa::path(
    delete,
    path = "/api/invoices/{id}",
    tag = "Invoices",
    params(("id" = Uuid, Path, description = "ID da fatura")),
    responses(
        (status = 204, description = "Fatura desativada"),
        (status = 403, description = "Sem permissão"),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_invoice(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .invoice_service
        .delete(&app_state.db_pool, &user.principal(), id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(StatusCode::NO_CONTENT)
}

// POST /api/invoices/{id}/payments
#[utoipa::path(
    post,
    path = "/api/invoices/{id}/payments",
    tag = "Invoices",
    request_body = RecordPaymentPayload,
    params(("id" = Uuid, Path, description = "ID da fatura")),
    responses(
        (status = 201, description = "Pagamento registrado", body = InvoiceDetail),
        (status = 409, description = "Excede o saldo ou fatura cancelada")
    ),
    security(("api_jwt" = []))
)]
pub async fn record_payment(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecordPaymentPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale))?;

    let detail = app_state
        .invoice_service
        .record_payment(&app_state.db_pool, &user.principal(), id, &payload)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::CREATED, Json(detail)))
}

// GET /api/invoices/{id}/pdf
#[utoipa::path(
    get,
    path = "/api/invoices/{id}/pdf",
    tag = "Invoices",
    params(("id" = Uuid, Path, description = "ID da fatura")),
    responses(
        (status = 200, description = "PDF da fatura", content_type = "application/pdf"),
        (status = 404, description = "Não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn download_invoice_pdf(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let (file_name, bytes) = app_state
        .invoice_service
        .generate_pdf(&app_state.db_pool, &user.principal(), id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", file_name)),
    ];
    Ok((StatusCode::OK, headers, bytes))
}
