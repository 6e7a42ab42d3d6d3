// src/models/task.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::access::OwnershipRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_open(self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::InProgress)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "task_priority", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
    Urgent,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    #[schema(ignore)]
    pub office_id: Uuid,
    pub case_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub assigned_to: Uuid,
    pub due_date: DateTime<Utc>,
    pub priority: TaskPriority,
    pub status: TaskStatus,

    // Alerta de atraso já enviado
    pub notification_sent: bool,

    pub created_by: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    // --- do processo (LEFT JOIN) ---
    pub case_number: Option<String>,
    pub lawyer_id: Option<Uuid>,
    pub assistant_lawyer_id: Option<Uuid>,
}

impl Task {
    pub fn ownership(&self) -> OwnershipRow {
        OwnershipRow {
            row_id: self.id,
            office_id: self.office_id,
            is_active: self.is_active,
            lawyer_id: self.lawyer_id,
            assistant_lawyer_id: self.assistant_lawyer_id,
            created_by: Some(self.created_by),
            assigned_to: Some(self.assigned_to),
            client_id: None,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskPayload {
    pub case_id: Option<Uuid>,
    #[validate(length(min = 2, message = "O título é obrigatório."))]
    pub title: String,
    pub description: Option<String>,
    // Se ausente, a tarefa é do próprio usuário
    pub assigned_to: Option<Uuid>,
    pub due_date: DateTime<Utc>,
    pub priority: Option<TaskPriority>,

    #[serde(default)]
    #[schema(ignore)]
    pub office_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskPayload {
    #[validate(length(min = 2, message = "O título é obrigatório."))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub assigned_to: Option<Uuid>,
    // Mudar o prazo rearma o alerta de atraso
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub case_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    /// Só tarefas abertas com prazo vencido
    pub overdue: Option<bool>,
}
