// src/handlers/notifications.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::{
    common::{
        db_utils::{Page, PageQuery},
        error::{ApiError, AppError},
    },
    config::AppState,
    middleware::{
        auth::AuthenticatedUser,
        i18n::Locale,
        rbac::{AdminOnly, RequireRole},
    },
    models::notification::{Notification, NotificationFilter, UnreadCount},
    services::reminder_sweep::SweepReport,
};

// GET /api/notifications
#[utoipa::path(
    get,
    path = "/api/notifications",
    tag = "Notifications",
    params(PageQuery, NotificationFilter),
    responses((status = 200, description = "Notificações do usuário", body = Page<Notification>)),
    security(("api_jwt" = []))
)]
pub async fn list_notifications(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Query(page): Query<PageQuery>,
    Query(filter): Query<NotificationFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let notifications = app_state
        .notification_service
        .list(&app_state.db_pool, &user.principal(), &filter, &page)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(notifications)))
}

// GET /api/notifications/unread-count
#[utoipa::path(
    get,
    path = "/api/notifications/unread-count",
    tag = "Notifications",
    responses((status = 200, description = "Não lidas", body = UnreadCount)),
    security(("api_jwt" = []))
)]
pub async fn unread_count(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let count = app_state
        .notification_service
        .unread_count(&app_state.db_pool, &user.principal())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(count)))
}

// POST /api/notifications/{id}/read
#[utoipa::path(
    post,
    path = "/api/notifications/{id}/read",
    tag = "Notifications",
    params(("id" = Uuid, Path, description = "ID da notificação")),
    responses(
        (status = 204, description = "Marcada como lida"),
        (status = 404, description = "Não encontrada")
    ),
    security(("api_jwt" = []))
)]
pub async fn mark_read(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    app_state
        .notification_service
        .mark_read(&app_state.db_pool, &user.principal(), id)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok(StatusCode::NO_CONTENT)
}

// POST /api/notifications/read-all
#[utoipa::path(
    post,
    path = "/api/notifications/read-all",
    tag = "Notifications",
    responses((status = 200, description = "Quantidade marcada como lida")),
    security(("api_jwt" = []))
)]
pub async fn mark_all_read(
    State(app_state): State<AppState>,
    locale: Locale,
    user: AuthenticatedUser,
) -> Result<impl IntoResponse, ApiError> {
    let updated = app_state
        .notification_service
        .mark_all_read(&app_state.db_pool, &user.principal())
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(json!({ "updated": updated }))))
}

// POST /api/notifications/sweep
#[utoipa::path(
    post,
    path = "/api/notifications/sweep",
    tag = "Notifications",
    responses(
        (status = 200, description = "Varredura do escritório executada", body = SweepReport),
        (status = 403, description = "Só administradores"),
        (status = 409, description = "Outra varredura em andamento")
    ),
    security(("api_jwt" = []))
)]
pub async fn run_sweep(
    State(app_state): State<AppState>,
    locale: Locale,
    admin: RequireRole<AdminOnly>,
) -> Result<impl IntoResponse, ApiError> {
    let office_id = admin.user().0.office_id;

    let report = app_state
        .reminder_sweep
        .run_all(Utc::now(), Some(office_id))
        .await
        .ok_or_else(|| {
            AppError::DataIntegrityConflict("Outra varredura está em andamento.".into()).to_api_error(&locale)
        })?;

    tracing::info!(%office_id, ?report, "varredura manual concluída");
    Ok((StatusCode::OK, Json(report)))
}
