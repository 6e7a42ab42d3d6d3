// src/models/court_session.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::access::OwnershipRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "court_session_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CourtSessionStatus {
    Scheduled,
    Completed,
    Postponed,
    Cancelled,
}

// A sessão (جلسة). A posse vem do processo: as colunas do processo
// chegam pelo JOIN.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourtSession {
    pub id: Uuid,
    #[schema(ignore)]
    pub office_id: Uuid,
    pub case_id: Uuid,
    pub session_date: DateTime<Utc>,
    pub court_name: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub status: CourtSessionStatus,

    // Marcadores de lembrete já enviados ("7d", "3d", "24h", "2h")
    #[schema(example = json!(["7d", "3d"]))]
    pub sent_reminders: Vec<String>,

    pub created_by: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    // --- do processo ---
    #[schema(example = "CASE-001")]
    pub case_number: String,
    pub case_title: String,
    pub lawyer_id: Uuid,
    pub assistant_lawyer_id: Option<Uuid>,
    pub client_id: Uuid,
}

impl CourtSession {
    pub fn ownership(&self) -> OwnershipRow {
        OwnershipRow {
            row_id: self.id,
            office_id: self.office_id,
            is_active: self.is_active,
            lawyer_id: Some(self.lawyer_id),
            assistant_lawyer_id: self.assistant_lawyer_id,
            created_by: Some(self.created_by),
            assigned_to: None,
            client_id: Some(self.client_id),
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourtSessionPayload {
    pub case_id: Uuid,
    pub session_date: DateTime<Utc>,
    pub court_name: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,

    #[serde(default)]
    #[schema(ignore)]
    pub office_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCourtSessionPayload {
    // Mudar a data reinicia os lembretes
    pub session_date: Option<DateTime<Utc>>,
    pub court_name: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub status: Option<CourtSessionStatus>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CourtSessionFilter {
    pub case_id: Option<Uuid>,
    pub status: Option<CourtSessionStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}
