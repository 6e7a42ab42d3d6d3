// src/models/case.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::access::OwnershipRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "case_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Open,
    Pending,
    Closed,
    Archived,
}

// O processo (قضية)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub id: Uuid,
    #[schema(ignore)]
    pub office_id: Uuid,

    #[schema(example = "CASE-001")]
    pub case_number: String,

    #[schema(example = "دعوى تعويض")]
    pub title: String,
    pub description: Option<String>,
    pub court_name: Option<String>,
    pub case_type: Option<String>,

    pub client_id: Uuid,
    // Exatamente um advogado responsável, no máximo um assistente
    pub lawyer_id: Uuid,
    pub assistant_lawyer_id: Option<Uuid>,

    pub status: CaseStatus,
    pub created_by: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Case {
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
pub struct CreateCasePayload {
    #[validate(length(min = 1, message = "O número do processo é obrigatório."))]
    #[schema(example = "CASE-001")]
    pub case_number: String,

    #[validate(length(min = 2, message = "O título é obrigatório."))]
    pub title: String,
    pub description: Option<String>,
    pub court_name: Option<String>,
    pub case_type: Option<String>,

    pub client_id: Uuid,
    // Se ausente, o próprio usuário é o advogado responsável
    pub lawyer_id: Option<Uuid>,
    pub assistant_lawyer_id: Option<Uuid>,
    pub status: Option<CaseStatus>,

    #[serde(default)]
    #[schema(ignore)]
    pub office_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCasePayload {
    #[validate(length(min = 2, message = "O título é obrigatório."))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub court_name: Option<String>,
    pub case_type: Option<String>,
    pub lawyer_id: Option<Uuid>,

    // Ausente: mantém. `null`: remove o assistente.
    #[serde(default, deserialize_with = "present_or_null")]
    #[schema(value_type = Option<Uuid>, nullable)]
    pub assistant_lawyer_id: Option<Option<Uuid>>,

    pub status: Option<CaseStatus>,
}

fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CaseFilter {
    pub status: Option<CaseStatus>,
    pub client_id: Option<Uuid>,
    pub lawyer_id: Option<Uuid>,
    /// Busca por número ou título
    pub q: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assistant_is_kept_when_absent_and_cleared_when_null() {
        let keep: UpdateCasePayload = serde_json::from_str(r#"{"title":"Nova"}"#).unwrap();
        assert_eq!(keep.assistant_lawyer_id, None);

        let clear: UpdateCasePayload = serde_json::from_str(r#"{"assistantLawyerId":null}"#).unwrap();
        assert_eq!(clear.assistant_lawyer_id, Some(None));

        let id = Uuid::new_v4();
        let set: UpdateCasePayload =
            serde_json::from_str(&format!(r#"{{"assistantLawyerId":"{}"}}"#, id)).unwrap();
        assert_eq!(set.assistant_lawyer_id, Some(Some(id)));
    }
}
