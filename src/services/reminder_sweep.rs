// src/services/reminder_sweep.rs

//! Varredura periódica de lembretes de sessão e alertas de tarefas atrasadas.
//!
//! A idempotência vem dos marcadores persistidos (`sent_reminders`,
//! `notification_sent`): cada unidade é "reivindicada" com um UPDATE
//! condicional na mesma transação que grava as notificações. Se outra
//! varredura chegou antes, o UPDATE não afeta linha nenhuma e a unidade é
//! pulada. O e-mail sai depois do commit, com tempo limitado.

use std::{sync::Arc, time::Duration as StdDuration};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sqlx::FromRow;
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    access::ResourceType,
    common::error::AppError,
    models::notification::{NewNotification, NotificationKind},
    services::{email::EmailMessage, notification_service::EmailDispatcher},
};

pub const SESSION_REMINDER_TITLE: &str = "تذكير بجلسة قادمة";
pub const TASK_OVERDUE_TITLE: &str = "مهمة متأخرة";

// =============================================================================
//  ANTECEDÊNCIAS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadTime {
    SevenDays,
    ThreeDays,
    TwentyFourHours,
    TwoHours,
}

impl LeadTime {
    /// Da mais folgada para a mais apertada: a ordem de processamento.
    pub const ALL: [LeadTime; 4] = [
        LeadTime::SevenDays,
        LeadTime::ThreeDays,
        LeadTime::TwentyFourHours,
        LeadTime::TwoHours,
    ];

    pub fn label(self) -> &'static str {
        match self {
            LeadTime::SevenDays => "7d",
            LeadTime::ThreeDays => "3d",
            LeadTime::TwentyFourHours => "24h",
            LeadTime::TwoHours => "2h",
        }
    }

    pub fn duration(self) -> Duration {
        match self {
            LeadTime::SevenDays => Duration::days(7),
            LeadTime::ThreeDays => Duration::days(3),
            LeadTime::TwentyFourHours => Duration::hours(24),
            LeadTime::TwoHours => Duration::hours(2),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            LeadTime::SevenDays => "خلال 7 أيام",
            LeadTime::ThreeDays => "خلال 3 أيام",
            LeadTime::TwentyFourHours => "خلال 24 ساعة",
            LeadTime::TwoHours => "خلال ساعتين",
        }
    }

    /// A antecedência mais apertada cuja janela `[now, now + L]` contém a data.
    pub fn tightest_for(now: DateTime<Utc>, session_date: DateTime<Utc>) -> Option<LeadTime> {
        if session_date < now {
            return None;
        }
        Self::ALL
            .iter()
            .rev()
            .copied()
            .find(|lead| session_date <= now + lead.duration())
    }

    /// O rótulo desta antecedência e de todas as mais folgadas.
    /// Um lembrete apertado torna os folgados obsoletos.
    pub fn labels_through(self) -> Vec<&'static str> {
        let mut labels = Vec::new();
        for lead in Self::ALL {
            labels.push(lead.label());
            if lead == self {
                break;
            }
        }
        labels
    }
}

// =============================================================================
//  O QUE A VARREDURA LÊ E GRAVA
// =============================================================================

#[derive(Debug, Clone, FromRow)]
pub struct DueSession {
    pub session_id: Uuid,
    pub office_id: Uuid,
    pub session_date: DateTime<Utc>,
    pub court_name: Option<String>,
    pub case_number: String,
    pub case_title: String,
    pub lawyer_id: Uuid,
    pub assistant_lawyer_id: Option<Uuid>,
}

#[derive(Debug, Clone, FromRow)]
pub struct OverdueTask {
    pub task_id: Uuid,
    pub office_id: Uuid,
    pub title: String,
    pub due_date: DateTime<Utc>,
    pub assigned_to: Uuid,
}

#[derive(Debug, Clone, FromRow)]
pub struct Recipient {
    pub user_id: Uuid,
    pub email: String,
    pub full_name: String,
}

/// Persistência da varredura. `claim_*` retorna `false` quando o marcador
/// já estava gravado (outra varredura reivindicou a unidade primeiro).
#[async_trait]
pub trait SweepStore: Send + Sync {
    /// Sessões agendadas e ativas com data em `[now, now + lead]` sem o rótulo de `lead`.
    async fn due_sessions(
        &self,
        now: DateTime<Utc>,
        lead: LeadTime,
        office_id: Option<Uuid>,
    ) -> Result<Vec<DueSession>, AppError>;

    async fn claim_session_reminder(
        &self,
        session_id: Uuid,
        label: &'static str,
        labels_to_mark: &[&'static str],
        notifications: &[NewNotification],
    ) -> Result<bool, AppError>;

    /// Tarefas não concluídas, vencidas e ainda sem alerta.
    async fn overdue_tasks(&self, now: DateTime<Utc>, office_id: Option<Uuid>) -> Result<Vec<OverdueTask>, AppError>;

    async fn claim_task_alert(&self, task_id: Uuid, notifications: &[NewNotification]) -> Result<bool, AppError>;

    /// Usuários ativos do escritório entre os ids pedidos.
    async fn recipients(&self, office_id: Uuid, user_ids: &[Uuid]) -> Result<Vec<Recipient>, AppError>;
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub session_reminders: u32,
    pub task_alerts: u32,
    pub emails_sent: u32,
    pub emails_failed: u32,
    pub failures: u32,
}

impl SweepReport {
    fn merge(&mut self, other: SweepReport) {
        self.session_reminders += other.session_reminders;
        self.task_alerts += other.task_alerts;
        self.emails_sent += other.emails_sent;
        self.emails_failed += other.emails_failed;
        self.failures += other.failures;
    }
}

// =============================================================================
//  A VARREDURA
// =============================================================================

#[derive(Clone)]
pub struct ReminderSweep {
    store: Arc<dyn SweepStore>,
    mailer: EmailDispatcher,
    // Uma varredura por vez neste processo
    guard: Arc<Mutex<()>>,
}

impl ReminderSweep {
    pub fn new(store: Arc<dyn SweepStore>, mailer: EmailDispatcher) -> Self {
        Self {
            store,
            mailer,
            guard: Arc::new(Mutex::new(())),
        }
    }

    /// Lembretes de sessão. `None` quando outra varredura está em andamento.
    pub async fn run_sessions(&self, now: DateTime<Utc>, office_id: Option<Uuid>) -> Option<SweepReport> {
        let _running = self.guard.try_lock().ok()?;
        Some(self.sweep_sessions(now, office_id).await)
    }

    pub async fn run_tasks(&self, now: DateTime<Utc>, office_id: Option<Uuid>) -> Option<SweepReport> {
        let _running = self.guard.try_lock().ok()?;
        Some(self.sweep_tasks(now, office_id).await)
    }

    /// Sessões e tarefas na mesma passada (endpoint de admin).
    pub async fn run_all(&self, now: DateTime<Utc>, office_id: Option<Uuid>) -> Option<SweepReport> {
        let _running = self.guard.try_lock().ok()?;
        let mut report = self.sweep_sessions(now, office_id).await;
        report.merge(self.sweep_tasks(now, office_id).await);
        Some(report)
    }

    async fn sweep_sessions(&self, now: DateTime<Utc>, office_id: Option<Uuid>) -> SweepReport {
        let mut report = SweepReport::default();

        for lead in LeadTime::ALL {
            let candidates = match self.store.due_sessions(now, lead, office_id).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    tracing::error!(bucket = lead.label(), "falha ao buscar sessões: {:?}", e);
                    report.failures += 1;
                    continue;
                }
            };

            for session in candidates {
                // Uma antecedência mais apertada também vale: fica para ela.
                if LeadTime::tightest_for(now, session.session_date) != Some(lead) {
                    continue;
                }

                match self.remind_session(&session, lead).await {
                    Ok(Some(unit)) => {
                        report.session_reminders += 1;
                        report.emails_sent += unit.emails_sent;
                        report.emails_failed += unit.emails_failed;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        tracing::error!(
                            session_id = %session.session_id,
                            bucket = lead.label(),
                            "falha no lembrete de sessão: {:?}",
                            e
                        );
                        report.failures += 1;
                    }
                }
            }
        }

        report
    }

    async fn remind_session(&self, session: &DueSession, lead: LeadTime) -> Result<Option<EmailTally>, AppError> {
        let mut wanted = vec![session.lawyer_id];
        if let Some(assistant) = session.assistant_lawyer_id.filter(|a| *a != session.lawyer_id) {
            wanted.push(assistant);
        }
        let recipients = self.store.recipients(session.office_id, &wanted).await?;

        let message = session_message(session, lead);
        let notifications: Vec<NewNotification> = recipients
            .iter()
            .map(|r| NewNotification {
                office_id: session.office_id,
                user_id: r.user_id,
                title: SESSION_REMINDER_TITLE.to_string(),
                message: message.clone(),
                kind: NotificationKind::SessionReminder,
                related_entity_type: Some(ResourceType::CourtSession.entity_name()),
                related_entity_id: Some(session.session_id),
            })
            .collect();

        let claimed = self
            .store
            .claim_session_reminder(session.session_id, lead.label(), &lead.labels_through(), &notifications)
            .await?;
        if !claimed {
            tracing::debug!(session_id = %session.session_id, bucket = lead.label(), "lembrete já enviado");
            return Ok(None);
        }

        tracing::info!(
            session_id = %session.session_id,
            bucket = lead.label(),
            recipients = notifications.len(),
            "🔔 lembrete de sessão criado"
        );

        Ok(Some(self.email_all(&recipients, SESSION_REMINDER_TITLE, &message).await))
    }

    async fn sweep_tasks(&self, now: DateTime<Utc>, office_id: Option<Uuid>) -> SweepReport {
        let mut report = SweepReport::default();

        let tasks = match self.store.overdue_tasks(now, office_id).await {
            Ok(tasks) => tasks,
            Err(e) => {
                tracing::error!("falha ao buscar tarefas atrasadas: {:?}", e);
                report.failures += 1;
                return report;
            }
        };

        for task in tasks {
            match self.alert_task(&task).await {
                Ok(Some(unit)) => {
                    report.task_alerts += 1;
                    report.emails_sent += unit.emails_sent;
                    report.emails_failed += unit.emails_failed;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(task_id = %task.task_id, "falha no alerta de tarefa: {:?}", e);
                    report.failures += 1;
                }
            }
        }

        report
    }

    async fn alert_task(&self, task: &OverdueTask) -> Result<Option<EmailTally>, AppError> {
        let recipients = self.store.recipients(task.office_id, &[task.assigned_to]).await?;

        let message = task_message(task);
        let notifications: Vec<NewNotification> = recipients
            .iter()
            .map(|r| NewNotification {
                office_id: task.office_id,
                user_id: r.user_id,
                title: TASK_OVERDUE_TITLE.to_string(),
                message: message.clone(),
                kind: NotificationKind::TaskOverdue,
                related_entity_type: Some(ResourceType::Task.entity_name()),
                related_entity_id: Some(task.task_id),
            })
            .collect();

        if !self.store.claim_task_alert(task.task_id, &notifications).await? {
            return Ok(None);
        }

        tracing::info!(task_id = %task.task_id, "⏰ alerta de tarefa atrasada criado");

        Ok(Some(self.email_all(&recipients, TASK_OVERDUE_TITLE, &message).await))
    }

    // Depois do commit: falha de e-mail não desfaz a notificação.
    async fn email_all(&self, recipients: &[Recipient], subject: &str, text: &str) -> EmailTally {
        let mut tally = EmailTally::default();
        if !self.mailer.is_enabled() {
            return tally;
        }

        for recipient in recipients.iter().filter(|r| !r.email.trim().is_empty()) {
            let message = EmailMessage {
                to: recipient.email.clone(),
                subject: subject.to_string(),
                text: format!("{}،\n\n{}", recipient.full_name, text),
            };
            match self.mailer.send(&message).await {
                Ok(true) => tally.emails_sent += 1,
                Ok(false) => tally.emails_failed += 1,
                Err(e) => {
                    tracing::warn!(user_id = %recipient.user_id, "falha no envio de e-mail: {:?}", e);
                    tally.emails_failed += 1;
                }
            }
        }

        tally
    }

    // =========================================================================
    //  O AGENDADOR
    // =========================================================================

    /// Laço de fundo com cadências separadas para sessões e tarefas.
    /// Termina quando `shutdown` muda.
    pub fn spawn(
        self,
        session_every: StdDuration,
        task_every: StdDuration,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut sessions = tokio::time::interval(session_every);
            sessions.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut tasks = tokio::time::interval(task_every);
            tasks.set_missed_tick_behavior(MissedTickBehavior::Skip);

            tracing::info!(
                session_every_secs = session_every.as_secs(),
                task_every_secs = task_every.as_secs(),
                "⏱️ varredura de notificações iniciada"
            );

            loop {
                tokio::select! {
                    _ = sessions.tick() => {
                        match self.run_sessions(Utc::now(), None).await {
                            Some(report) => tracing::info!(?report, "varredura de sessões concluída"),
                            None => tracing::warn!("varredura de sessões pulada: outra em andamento"),
                        }
                    }
                    _ = tasks.tick() => {
                        match self.run_tasks(Utc::now(), None).await {
                            Some(report) => tracing::info!(?report, "varredura de tarefas concluída"),
                            None => tracing::warn!("varredura de tarefas pulada: outra em andamento"),
                        }
                    }
                    _ = shutdown.changed() => {
                        tracing::info!("varredura de notificações encerrada");
                        break;
                    }
                }
            }
        })
    }
}

#[derive(Debug, Default)]
struct EmailTally {
    emails_sent: u32,
    emails_failed: u32,
}

fn session_message(session: &DueSession, lead: LeadTime) -> String {
    let mut message = format!(
        "لديك جلسة {} في القضية {} - {} بتاريخ {}",
        lead.describe(),
        session.case_number,
        session.case_title,
        session.session_date.format("%Y-%m-%d %H:%M UTC"),
    );
    if let Some(court) = session.court_name.as_deref().filter(|c| !c.is_empty()) {
        message.push_str(&format!(" أمام {}", court));
    }
    message
}

fn task_message(task: &OverdueTask) -> String {
    format!(
        "تجاوزت المهمة \"{}\" موعدها النهائي ({})",
        task.title,
        task.due_date.format("%Y-%m-%d %H:%M UTC"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::email::EmailTransport;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    // ---
    // Store em memória com a mesma semântica do Postgres
    // ---

    #[derive(Clone)]
    struct SessionRow {
        id: Uuid,
        office_id: Uuid,
        date: DateTime<Utc>,
        scheduled: bool,
        active: bool,
        sent: Vec<String>,
        lawyer_id: Uuid,
        assistant_lawyer_id: Option<Uuid>,
    }

    #[derive(Clone)]
    struct TaskRow {
        id: Uuid,
        office_id: Uuid,
        due: DateTime<Utc>,
        completed: bool,
        sent: bool,
        assigned_to: Uuid,
    }

    #[derive(Default)]
    struct MemoryStore {
        sessions: StdMutex<Vec<SessionRow>>,
        tasks: StdMutex<Vec<TaskRow>>,
        users: StdMutex<Vec<(Uuid, Uuid, String, bool)>>, // (id, office, email, active)
        notifications: StdMutex<Vec<NewNotification>>,
        fail_claims_for: StdMutex<HashSet<Uuid>>,
    }

    impl MemoryStore {
        fn add_user(&self, office_id: Uuid, email: &str) -> Uuid {
            let id = Uuid::new_v4();
            self.users.lock().unwrap().push((id, office_id, email.to_string(), true));
            id
        }

        fn add_session(&self, office_id: Uuid, date: DateTime<Utc>, lawyer: Uuid, assistant: Option<Uuid>) -> Uuid {
            let id = Uuid::new_v4();
            self.sessions.lock().unwrap().push(SessionRow {
                id,
                office_id,
                date,
                scheduled: true,
                active: true,
                sent: vec![],
                lawyer_id: lawyer,
                assistant_lawyer_id: assistant,
            });
            id
        }

        fn add_task(&self, office_id: Uuid, due: DateTime<Utc>, assigned_to: Uuid) -> Uuid {
            let id = Uuid::new_v4();
            self.tasks.lock().unwrap().push(TaskRow {
                id,
                office_id,
                due,
                completed: false,
                sent: false,
                assigned_to,
            });
            id
        }

        fn sent_reminders(&self, id: Uuid) -> Vec<String> {
            let sessions = self.sessions.lock().unwrap();
            sessions.iter().find(|s| s.id == id).map(|s| s.sent.clone()).unwrap_or_default()
        }

        fn task_sent(&self, id: Uuid) -> bool {
            self.tasks.lock().unwrap().iter().any(|t| t.id == id && t.sent)
        }

        fn notifications(&self) -> Vec<NewNotification> {
            self.notifications.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SweepStore for MemoryStore {
        async fn due_sessions(
            &self,
            now: DateTime<Utc>,
            lead: LeadTime,
            office_id: Option<Uuid>,
        ) -> Result<Vec<DueSession>, AppError> {
            let sessions = self.sessions.lock().unwrap();
            Ok(sessions
                .iter()
                .filter(|s| s.scheduled && s.active)
                .filter(|s| s.date >= now && s.date <= now + lead.duration())
                .filter(|s| !s.sent.iter().any(|l| l == lead.label()))
                .filter(|s| office_id.is_none_or(|o| o == s.office_id))
                .map(|s| DueSession {
                    session_id: s.id,
                    office_id: s.office_id,
                    session_date: s.date,
                    court_name: Some("محكمة القاهرة الابتدائية".into()),
                    case_number: "CASE-001".into(),
                    case_title: "دعوى تعويض".into(),
                    lawyer_id: s.lawyer_id,
                    assistant_lawyer_id: s.assistant_lawyer_id,
                })
                .collect())
        }

        async fn claim_session_reminder(
            &self,
            session_id: Uuid,
            label: &'static str,
            labels_to_mark: &[&'static str],
            notifications: &[NewNotification],
        ) -> Result<bool, AppError> {
            if self.fail_claims_for.lock().unwrap().contains(&session_id) {
                return Err(AppError::InternalServerError(anyhow::anyhow!("falha simulada")));
            }
            let mut sessions = self.sessions.lock().unwrap();
            let Some(row) = sessions.iter_mut().find(|s| s.id == session_id) else {
                return Ok(false);
            };
            if row.sent.iter().any(|l| l == label) {
                return Ok(false);
            }
            for l in labels_to_mark {
                if !row.sent.iter().any(|s| s == l) {
                    row.sent.push(l.to_string());
                }
            }
            self.notifications.lock().unwrap().extend_from_slice(notifications);
            Ok(true)
        }

        async fn overdue_tasks(&self, now: DateTime<Utc>, office_id: Option<Uuid>) -> Result<Vec<OverdueTask>, AppError> {
            let tasks = self.tasks.lock().unwrap();
            Ok(tasks
                .iter()
                .filter(|t| !t.completed && !t.sent && t.due < now)
                .filter(|t| office_id.is_none_or(|o| o == t.office_id))
                .map(|t| OverdueTask {
                    task_id: t.id,
                    office_id: t.office_id,
                    title: "تقديم مذكرة".into(),
                    due_date: t.due,
                    assigned_to: t.assigned_to,
                })
                .collect())
        }

        async fn claim_task_alert(&self, task_id: Uuid, notifications: &[NewNotification]) -> Result<bool, AppError> {
            let mut tasks = self.tasks.lock().unwrap();
            let Some(row) = tasks.iter_mut().find(|t| t.id == task_id && !t.sent) else {
                return Ok(false);
            };
            row.sent = true;
            self.notifications.lock().unwrap().extend_from_slice(notifications);
            Ok(true)
        }

        async fn recipients(&self, office_id: Uuid, user_ids: &[Uuid]) -> Result<Vec<Recipient>, AppError> {
            let users = self.users.lock().unwrap();
            Ok(users
                .iter()
                .filter(|(id, office, _, active)| *active && *office == office_id && user_ids.contains(id))
                .map(|(id, _, email, _)| Recipient {
                    user_id: *id,
                    email: email.clone(),
                    full_name: "أحمد".into(),
                })
                .collect())
        }
    }

    // ---
    // Transporte que grava as chamadas
    // ---

    #[derive(Default)]
    struct RecordingTransport {
        calls: AtomicUsize,
        hang: bool,
    }

    #[async_trait]
    impl EmailTransport for RecordingTransport {
        async fn send(&self, _message: &EmailMessage) -> Result<bool, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.hang {
                tokio::time::sleep(StdDuration::from_secs(3600)).await;
            }
            Ok(true)
        }
    }

    fn sweep_with(store: Arc<MemoryStore>, transport: Arc<RecordingTransport>, email: bool) -> ReminderSweep {
        let mailer = EmailDispatcher::new(transport, email, StdDuration::from_secs(10));
        ReminderSweep::new(store, mailer)
    }

    #[test]
    fn tightest_bucket_is_chosen() {
        let now = Utc::now();
        assert_eq!(LeadTime::tightest_for(now, now + Duration::hours(23)), Some(LeadTime::TwentyFourHours));
        assert_eq!(LeadTime::tightest_for(now, now + Duration::hours(2)), Some(LeadTime::TwoHours));
        assert_eq!(LeadTime::tightest_for(now, now + Duration::days(5)), Some(LeadTime::SevenDays));
        assert_eq!(LeadTime::tightest_for(now, now + Duration::days(8)), None);
        assert_eq!(LeadTime::tightest_for(now, now - Duration::minutes(1)), None);
    }

    #[test]
    fn labels_through_includes_looser_buckets() {
        assert_eq!(LeadTime::SevenDays.labels_through(), vec!["7d"]);
        assert_eq!(LeadTime::TwentyFourHours.labels_through(), vec!["7d", "3d", "24h"]);
    }

    #[tokio::test]
    async fn session_23h_away_is_reminded_once_across_two_runs() {
        let store = Arc::new(MemoryStore::default());
        let transport = Arc::new(RecordingTransport::default());
        let office = Uuid::new_v4();
        let lawyer = store.add_user(office, "lawyer@office.com");
        let now = Utc::now();
        let session = store.add_session(office, now + Duration::hours(23), lawyer, None);

        let sweep = sweep_with(store.clone(), transport.clone(), true);
        let first = sweep.run_sessions(now, None).await.unwrap();
        let second = sweep.run_sessions(now + Duration::minutes(30), None).await.unwrap();

        assert_eq!(first.session_reminders, 1);
        assert_eq!(second.session_reminders, 0);
        assert_eq!(store.notifications().len(), 1);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);

        let sent = store.sent_reminders(session);
        assert_eq!(sent.iter().filter(|l| *l == "24h").count(), 1);
        // Sem "7d"/"3d" atrasados depois
        assert!(sent.contains(&"7d".to_string()) && sent.contains(&"3d".to_string()));
    }

    #[tokio::test]
    async fn overdue_task_is_alerted_once() {
        let store = Arc::new(MemoryStore::default());
        let transport = Arc::new(RecordingTransport::default());
        let office = Uuid::new_v4();
        let trainee = store.add_user(office, "trainee@office.com");
        let now = Utc::now();
        let task = store.add_task(office, now - Duration::hours(1), trainee);

        let sweep = sweep_with(store.clone(), transport, false);
        let first = sweep.run_tasks(now, None).await.unwrap();
        let second = sweep.run_tasks(now, None).await.unwrap();

        assert_eq!(first.task_alerts, 1);
        assert_eq!(second.task_alerts, 0);
        assert!(store.task_sent(task));

        let notifications = store.notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].title, TASK_OVERDUE_TITLE);
        assert_eq!(notifications[0].user_id, trainee);
        assert_eq!(notifications[0].related_entity_id, Some(task));
    }

    #[tokio::test]
    async fn hearing_two_hours_out_end_to_end() {
        let store = Arc::new(MemoryStore::default());
        let transport = Arc::new(RecordingTransport::default());
        let office = Uuid::new_v4();
        let l1 = store.add_user(office, "l1@office.com");
        let now = Utc::now();
        let session = store.add_session(office, now + Duration::hours(2), l1, None);

        let report = sweep_with(store.clone(), transport.clone(), true)
            .run_sessions(now, None)
            .await
            .unwrap();

        assert_eq!(report.session_reminders, 1);
        assert_eq!(report.emails_sent, 1);

        let notifications = store.notifications();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].user_id, l1);
        assert_eq!(notifications[0].title, SESSION_REMINDER_TITLE);
        assert_eq!(notifications[0].kind, NotificationKind::SessionReminder);
        assert_eq!(notifications[0].related_entity_type, Some("session"));
        assert_eq!(notifications[0].related_entity_id, Some(session));
        assert!(notifications[0].message.contains("CASE-001"));

        assert!(store.sent_reminders(session).contains(&"2h".to_string()));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn assistant_is_notified_once_even_when_also_lawyer() {
        let store = Arc::new(MemoryStore::default());
        let transport = Arc::new(RecordingTransport::default());
        let office = Uuid::new_v4();
        let lawyer = store.add_user(office, "l@office.com");
        let assistant = store.add_user(office, "a@office.com");
        let now = Utc::now();
        store.add_session(office, now + Duration::days(2), lawyer, Some(assistant));
        store.add_session(office, now + Duration::days(2), lawyer, Some(lawyer));

        let report = sweep_with(store.clone(), transport, false)
            .run_sessions(now, None)
            .await
            .unwrap();

        assert_eq!(report.session_reminders, 2);
        assert_eq!(store.notifications().len(), 3);
    }

    #[tokio::test]
    async fn later_bucket_fires_after_time_passes() {
        let store = Arc::new(MemoryStore::default());
        let transport = Arc::new(RecordingTransport::default());
        let office = Uuid::new_v4();
        let lawyer = store.add_user(office, "l@office.com");
        let now = Utc::now();
        let session = store.add_session(office, now + Duration::days(5), lawyer, None);

        let sweep = sweep_with(store.clone(), transport, false);
        sweep.run_sessions(now, None).await.unwrap();
        assert_eq!(store.sent_reminders(session), vec!["7d".to_string()]);

        let later = now + Duration::days(3);
        let report = sweep.run_sessions(later, None).await.unwrap();
        assert_eq!(report.session_reminders, 1);
        assert_eq!(store.sent_reminders(session), vec!["7d".to_string(), "3d".to_string()]);
    }

    #[tokio::test]
    async fn one_failing_session_does_not_stop_the_others() {
        let store = Arc::new(MemoryStore::default());
        let transport = Arc::new(RecordingTransport::default());
        let office = Uuid::new_v4();
        let lawyer = store.add_user(office, "l@office.com");
        let now = Utc::now();
        let broken = store.add_session(office, now + Duration::hours(1), lawyer, None);
        let healthy = store.add_session(office, now + Duration::hours(1), lawyer, None);
        store.fail_claims_for.lock().unwrap().insert(broken);

        let sweep = sweep_with(store.clone(), transport, false);
        let report = sweep.run_sessions(now, None).await.unwrap();

        assert_eq!(report.failures, 1);
        assert_eq!(report.session_reminders, 1);
        assert!(store.sent_reminders(broken).is_empty());
        assert!(store.sent_reminders(healthy).contains(&"2h".to_string()));

        // Corrigido o problema, o próximo tick reenvia
        store.fail_claims_for.lock().unwrap().clear();
        let retry = sweep.run_sessions(now, None).await.unwrap();
        assert_eq!(retry.session_reminders, 1);
        assert!(store.sent_reminders(broken).contains(&"2h".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_email_is_counted_as_failure_and_marker_stays() {
        let store = Arc::new(MemoryStore::default());
        let transport = Arc::new(RecordingTransport { hang: true, ..Default::default() });
        let office = Uuid::new_v4();
        let lawyer = store.add_user(office, "l@office.com");
        let now = Utc::now();
        let session = store.add_session(office, now + Duration::hours(1), lawyer, None);

        let report = sweep_with(store.clone(), transport, true)
            .run_sessions(now, None)
            .await
            .unwrap();

        assert_eq!(report.session_reminders, 1);
        assert_eq!(report.emails_failed, 1);
        assert_eq!(store.notifications().len(), 1);
        assert!(store.sent_reminders(session).contains(&"2h".to_string()));
    }

    #[tokio::test]
    async fn office_limited_run_ignores_other_offices() {
        let store = Arc::new(MemoryStore::default());
        let transport = Arc::new(RecordingTransport::default());
        let office_a = Uuid::new_v4();
        let office_b = Uuid::new_v4();
        let la = store.add_user(office_a, "a@office.com");
        let lb = store.add_user(office_b, "b@office.com");
        let now = Utc::now();
        store.add_session(office_a, now + Duration::hours(1), la, None);
        let other = store.add_session(office_b, now + Duration::hours(1), lb, None);
        store.add_task(office_b, now - Duration::hours(1), lb);

        let report = sweep_with(store.clone(), transport, false)
            .run_all(now, Some(office_a))
            .await
            .unwrap();

        assert_eq!(report.session_reminders, 1);
        assert_eq!(report.task_alerts, 0);
        assert!(store.sent_reminders(other).is_empty());
    }

    #[tokio::test]
    async fn overlapping_run_is_skipped() {
        let store = Arc::new(MemoryStore::default());
        let sweep = sweep_with(store, Arc::new(RecordingTransport::default()), false);

        let _held = sweep.guard.lock().await;
        assert!(sweep.run_sessions(Utc::now(), None).await.is_none());
        assert!(sweep.run_tasks(Utc::now(), None).await.is_none());
    }

    #[tokio::test]
    async fn completed_or_cancelled_sessions_are_not_reminded() {
        let store = Arc::new(MemoryStore::default());
        let office = Uuid::new_v4();
        let lawyer = store.add_user(office, "l@office.com");
        let now = Utc::now();
        let session = store.add_session(office, now + Duration::hours(1), lawyer, None);
        store.sessions.lock().unwrap()[0].scheduled = false;

        let report = sweep_with(store.clone(), Arc::new(RecordingTransport::default()), false)
            .run_sessions(now, None)
            .await
            .unwrap();

        assert_eq!(report.session_reminders, 0);
        assert!(store.sent_reminders(session).is_empty());
    }
}
