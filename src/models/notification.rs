// src/models/notification.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "notification_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    SessionReminder,
    TaskOverdue,
    CaseUpdate,
    TaskAssigned,
    General,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    #[schema(ignore)]
    pub office_id: Uuid,
    pub user_id: Uuid,
    #[schema(example = "تذكير بجلسة قادمة")]
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub is_read: bool,
    #[schema(example = "session")]
    pub related_entity_type: Option<String>,
    pub related_entity_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Notificação a ser gravada (sweep ou eventos dos serviços).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub office_id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub related_entity_type: Option<&'static str>,
    pub related_entity_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct NotificationFilter {
    pub unread_only: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UnreadCount {
    pub unread: i64,
}
