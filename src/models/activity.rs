// src/models/activity.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "activity_action", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    Create,
    Update,
    Delete,
    Payment,
    Login,
}

// Linha do log de auditoria
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: Uuid,
    #[schema(ignore)]
    pub office_id: Uuid,
    pub user_id: Uuid,
    pub action_type: ActivityAction,
    #[schema(example = "case")]
    pub entity_type: String,
    pub entity_id: Uuid,
    pub description: String,
    pub created_at: DateTime<Utc>,

    pub user_name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewActivity {
    pub office_id: Uuid,
    pub user_id: Uuid,
    pub action_type: ActivityAction,
    pub entity_type: &'static str,
    pub entity_id: Uuid,
    pub description: String,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ActivityFilter {
    pub entity_type: Option<String>,
    pub entity_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}
