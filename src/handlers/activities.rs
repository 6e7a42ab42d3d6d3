// src/handlers/activities.rs

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::{
    common::{
        db_utils::{Page, PageQuery},
        error::ApiError,
    },
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{AdminOnly, RequireRole},
    },
    models::activity::{Activity, ActivityFilter},
};

// GET /api/activities
#[utoipa::path(
    get,
    path = "/api/activities",
    tag = "Activities",
    params(PageQuery, ActivityFilter),
    responses(
        (status = 200, description = "Log de auditoria do escritório", body = Page<Activity>),
        (status = 403, description = "Só administradores")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_activities(
    State(app_state): State<AppState>,
    locale: Locale,
    admin: RequireRole<AdminOnly>,
    Query(page): Query<PageQuery>,
    Query(filter): Query<ActivityFilter>,
) -> Result<impl IntoResponse, ApiError> {
    let activities = app_state
        .activity_service
        .list(&app_state.db_pool, &admin.user().principal(), &filter, &page)
        .await
        .map_err(|e| e.to_api_error(&locale))?;

    Ok((StatusCode::OK, Json(activities)))
}
