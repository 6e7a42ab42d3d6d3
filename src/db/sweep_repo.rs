// src/db/sweep_repo.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::NotificationRepository,
    models::notification::NewNotification,
    services::reminder_sweep::{DueSession, LeadTime, OverdueTask, Recipient, SweepStore},
};

// A varredura roda fora de qualquer requisição: o repositório guarda o pool.
#[derive(Clone)]
pub struct PgSweepStore {
    pool: PgPool,
    notifications: NotificationRepository,
}

impl PgSweepStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            notifications: NotificationRepository::new(),
        }
    }
}

#[async_trait]
impl SweepStore for PgSweepStore {
    async fn due_sessions(
        &self,
        now: DateTime<Utc>,
        lead: LeadTime,
        office_id: Option<Uuid>,
    ) -> Result<Vec<DueSession>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT s.id AS session_id, s.office_id, s.session_date,
                   COALESCE(s.court_name, c.court_name) AS court_name,
                   c.case_number, c.title AS case_title,
                   c.lawyer_id, c.assistant_lawyer_id
            FROM court_sessions s
            JOIN cases c ON c.id = s.case_id
            WHERE s.status = 'scheduled'
              AND s.is_active = TRUE
              AND s.session_date >= "#,
        );
        qb.push_bind(now)
            .push(" AND s.session_date <= ")
            .push_bind(now + lead.duration())
            .push(" AND NOT (")
            .push_bind(lead.label())
            .push(" = ANY(s.sent_reminders))");
        if let Some(office_id) = office_id {
            qb.push(" AND s.office_id = ").push_bind(office_id);
        }
        qb.push(" ORDER BY s.session_date ASC");

        let sessions = qb.build_query_as::<DueSession>().fetch_all(&self.pool).await?;
        Ok(sessions)
    }

    async fn claim_session_reminder(
        &self,
        session_id: Uuid,
        label: &'static str,
        labels_to_mark: &[&'static str],
        notifications: &[NewNotification],
    ) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        // Reivindica a unidade: só uma varredura vê rows_affected = 1.
        let labels: Vec<String> = labels_to_mark.iter().map(|l| l.to_string()).collect();
        let claimed = sqlx::query(
            r#"
            UPDATE court_sessions
            SET sent_reminders = sent_reminders || ARRAY(
                    SELECT l FROM unnest($3::text[]) AS l
                    WHERE NOT (l = ANY(court_sessions.sent_reminders))
                ),
                updated_at = NOW()
            WHERE id = $1
              AND status = 'scheduled'
              AND is_active = TRUE
              AND NOT ($2 = ANY(sent_reminders))
            "#,
        )
        .bind(session_id)
        .bind(label)
        .bind(&labels)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if claimed == 0 {
            // Drop do tx = rollback
            return Ok(false);
        }

        for notification in notifications {
            self.notifications.insert(&mut *tx, notification).await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn overdue_tasks(&self, now: DateTime<Utc>, office_id: Option<Uuid>) -> Result<Vec<OverdueTask>, AppError> {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT t.id AS task_id, t.office_id, t.title, t.due_date, t.assigned_to
            FROM tasks t
            WHERE t.status <> 'completed'
              AND t.is_active = TRUE
              AND t.notification_sent = FALSE
              AND t.due_date < "#,
        );
        qb.push_bind(now);
        if let Some(office_id) = office_id {
            qb.push(" AND t.office_id = ").push_bind(office_id);
        }
        qb.push(" ORDER BY t.due_date ASC");

        let tasks = qb.build_query_as::<OverdueTask>().fetch_all(&self.pool).await?;
        Ok(tasks)
    }

    async fn claim_task_alert(&self, task_id: Uuid, notifications: &[NewNotification]) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let claimed = sqlx::query(
            "UPDATE tasks SET notification_sent = TRUE, updated_at = NOW() WHERE id = $1 AND notification_sent = FALSE",
        )
        .bind(task_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if claimed == 0 {
            return Ok(false);
        }

        for notification in notifications {
            self.notifications.insert(&mut *tx, notification).await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn recipients(&self, office_id: Uuid, user_ids: &[Uuid]) -> Result<Vec<Recipient>, AppError> {
        let recipients = sqlx::query_as::<_, Recipient>(
            r#"
            SELECT id AS user_id, email, full_name
            FROM users
            WHERE office_id = $1 AND id = ANY($2) AND is_active = TRUE
            "#,
        )
        .bind(office_id)
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(recipients)
    }
}
