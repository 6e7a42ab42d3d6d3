// src/services/dashboard_service.rs

use chrono::{Duration, Utc};
use sqlx::{Acquire, Executor, Postgres};

use crate::{
    access::{self, Denial, Principal, ResourceType, ScopeFilter, Visibility},
    common::error::AppError,
    db::{
        CaseRepository, ClientRepository, CourtSessionRepository, InvoiceRepository, NotificationRepository,
        TaskRepository,
    },
    models::{
        case::{CaseFilter, CaseStatus},
        client::ClientFilter,
        court_session::{CourtSessionFilter, CourtSessionStatus},
        dashboard::DashboardSummary,
        notification::NotificationFilter,
        task::TaskFilter,
    },
};

const UPCOMING_LIMIT: i64 = 5;

#[derive(Clone, Default)]
pub struct DashboardService {
    cases: CaseRepository,
    clients: ClientRepository,
    sessions: CourtSessionRepository,
    invoices: InvoiceRepository,
    tasks: TaskRepository,
    notifications: NotificationRepository,
}

/// Recurso que o papel não enxerga vira card vazio, não erro.
fn scope_or_hidden(principal: &Principal, resource: ResourceType) -> Result<Option<ScopeFilter>, AppError> {
    match access::scope_filter(principal, resource, Visibility::ActiveOnly) {
        Ok(scope) => Ok(Some(scope)),
        Err(Denial::RoleForbidden) => Ok(None),
        Err(denial) => Err(denial.into()),
    }
}

impl DashboardService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_summary<'e, E>(&self, executor: E, principal: &Principal) -> Result<DashboardSummary, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        // Snapshot consistente dos contadores
        let mut tx = executor.begin().await?;
        let now = Utc::now();
        let week_ahead = now + Duration::days(7);

        let open_cases = match scope_or_hidden(principal, ResourceType::Case)? {
            Some(scope) => {
                let filter = CaseFilter { status: Some(CaseStatus::Open), ..Default::default() };
                self.cases.count(&mut *tx, &scope, &filter).await?
            }
            None => 0,
        };

        let active_clients = match scope_or_hidden(principal, ResourceType::Client)? {
            Some(scope) => self.clients.count(&mut *tx, &scope, &ClientFilter::default()).await?,
            None => 0,
        };

        let (sessions_next_7_days, upcoming_sessions) = match scope_or_hidden(principal, ResourceType::CourtSession)? {
            Some(scope) => {
                let filter = CourtSessionFilter {
                    status: Some(CourtSessionStatus::Scheduled),
                    from: Some(now),
                    to: Some(week_ahead),
                    ..Default::default()
                };
                let total = self.sessions.count(&mut *tx, &scope, &filter).await?;
                let upcoming = self.sessions.upcoming(&mut *tx, &scope, week_ahead, UPCOMING_LIMIT).await?;
                (total, upcoming)
            }
            None => (0, Vec::new()),
        };

        let (overdue_tasks, my_open_tasks) = match scope_or_hidden(principal, ResourceType::Task)? {
            Some(scope) => {
                let filter = TaskFilter { overdue: Some(true), ..Default::default() };
                let overdue = self.tasks.count(&mut *tx, &scope, &filter).await?;
                let mine = self
                    .tasks
                    .open_for_user(&mut *tx, &scope, principal.user_id, UPCOMING_LIMIT)
                    .await?;
                (overdue, mine)
            }
            None => (0, Vec::new()),
        };

        let outstanding_balance = match scope_or_hidden(principal, ResourceType::Invoice)? {
            Some(scope) => Some(self.invoices.outstanding_balance(&mut *tx, &scope).await?),
            None => None,
        };

        let unread_filter = NotificationFilter { unread_only: Some(true) };
        let unread_notifications = self
            .notifications
            .count(&mut *tx, principal.office_id, principal.user_id, &unread_filter)
            .await?;

        tx.commit().await?;

        Ok(DashboardSummary {
            open_cases,
            active_clients,
            sessions_next_7_days,
            overdue_tasks,
            outstanding_balance,
            unread_notifications,
            upcoming_sessions,
            my_open_tasks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Role;
    use uuid::Uuid;

    fn principal(role: Role, client_id: Option<Uuid>) -> Principal {
        Principal {
            user_id: Uuid::new_v4(),
            role,
            office_id: Uuid::new_v4(),
            client_id,
        }
    }

    #[test]
    fn trainee_gets_no_finance_card() {
        let trainee = principal(Role::Trainee, None);
        assert!(scope_or_hidden(&trainee, ResourceType::Invoice).unwrap().is_none());
        assert!(scope_or_hidden(&trainee, ResourceType::Case).unwrap().is_some());
    }

    #[test]
    fn unlinked_client_user_is_denied_not_hidden() {
        let client = principal(Role::Client, None);
        let result = scope_or_hidden(&client, ResourceType::Case);
        assert!(matches!(result, Err(AppError::AccessDenied(Denial::MissingClientLink))));
    }

    #[test]
    fn client_user_has_no_task_card() {
        let client = principal(Role::Client, Some(Uuid::new_v4()));
        assert!(scope_or_hidden(&client, ResourceType::Task).unwrap().is_none());
    }
}
