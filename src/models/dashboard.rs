// src/models/dashboard.rs

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use super::court_session::CourtSession;
use super::task::Task;

// Os cards do topo. Cada contador usa o escopo do usuário:
// um advogado vê os números dos próprios processos.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub open_cases: i64,
    pub active_clients: i64,
    pub sessions_next_7_days: i64,
    pub overdue_tasks: i64,

    // None quando o papel não enxerga o financeiro (estagiário)
    #[schema(value_type = Option<f64>)]
    pub outstanding_balance: Option<Decimal>,

    pub unread_notifications: i64,

    pub upcoming_sessions: Vec<CourtSession>,
    pub my_open_tasks: Vec<Task>,
}
