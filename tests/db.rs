// Testes contra Postgres real (MIZAN_TEST_DATABASE_URL).
// Cobrem o que o armazenamento em memória não alcança: locks e o SQL de reivindicação.

mod common;

use std::{path::PathBuf, sync::Arc, time::Duration};

use chrono::{Duration as ChronoDuration, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use mizan::{
    access::Role,
    common::error::AppError,
    db::{
        ActivityRepository, CaseRepository, InvoiceRepository, NotificationRepository, OfficeRepository, PgSweepStore,
        UserRepository,
    },
    models::{auth::UpdateUserPayload, case::UpdateCasePayload, invoice::RecordPaymentPayload},
    services::{
        activity_service::ActivityService,
        case_service::CaseService,
        email::LogEmailTransport,
        invoice_service::InvoiceService,
        notification_service::{EmailDispatcher, NotificationService},
        reminder_sweep::ReminderSweep,
        user_service::UserService,
    },
};

// Tempo para a tarefa concorrente chegar até o lock
const LOCK_WAIT: Duration = Duration::from_millis(300);

fn invoice_service(pool: &PgPool) -> InvoiceService {
    InvoiceService::new(
        InvoiceRepository::new(),
        OfficeRepository::new(),
        ActivityService::new(ActivityRepository::new(), pool.clone()),
        PathBuf::from("./fonts"),
    )
}

fn user_service(pool: &PgPool) -> UserService {
    UserService::new(
        UserRepository::new(),
        ActivityService::new(ActivityRepository::new(), pool.clone()),
    )
}

fn payment(amount: i64) -> RecordPaymentPayload {
    RecordPaymentPayload {
        amount: Decimal::from(amount),
        method: None,
        reference: None,
        paid_at: None,
    }
}

async fn invoice_state(pool: &PgPool, id: Uuid) -> (bool, Decimal, i64) {
    let (is_active, paid): (bool, Decimal) =
        sqlx::query_as("SELECT is_active, paid_amount FROM invoices WHERE id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
            .unwrap();
    let payments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoice_payments WHERE invoice_id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
        .unwrap();
    (is_active, paid, payments)
}

#[tokio::test]
async fn payment_updates_balance_of_active_invoice() {
    let Some(pool) = common::test_pool().await else { return };
    let fx = common::seed_office(&pool).await;
    let invoice_id = common::insert_invoice(&pool, &fx, Decimal::from(100)).await;

    let detail = invoice_service(&pool)
        .record_payment(&pool, &fx.admin(), invoice_id, &payment(40))
        .await
        .unwrap();

    assert_eq!(detail.invoice.paid_amount, Decimal::from(40));
    assert_eq!(detail.payments.len(), 1);
}

#[tokio::test]
async fn payment_waiting_on_lock_does_not_land_on_deactivated_invoice() {
    let Some(pool) = common::test_pool().await else { return };
    let fx = common::seed_office(&pool).await;
    let invoice_id = common::insert_invoice(&pool, &fx, Decimal::from(100)).await;

    // Outra transação segura a fatura
    let mut holder = pool.begin().await.unwrap();
    sqlx::query("SELECT id FROM invoices WHERE id = $1 FOR UPDATE")
        .bind(invoice_id)
        .execute(&mut *holder)
        .await
        .unwrap();

    let pending = tokio::spawn({
        let pool = pool.clone();
        let service = invoice_service(&pool);
        let principal = fx.admin();
        async move { service.record_payment(&pool, &principal, invoice_id, &payment(10)).await }
    });
    tokio::time::sleep(LOCK_WAIT).await;

    sqlx::query("UPDATE invoices SET is_active = FALSE WHERE id = $1")
        .bind(invoice_id)
        .execute(&mut *holder)
        .await
        .unwrap();
    holder.commit().await.unwrap();

    let result = pending.await.unwrap();
    assert!(matches!(result, Err(AppError::ResourceNotFound(_))), "{:?}", result.map(|d| d.invoice.paid_amount));

    let (is_active, paid, payments) = invoice_state(&pool, invoice_id).await;
    assert!(!is_active);
    assert_eq!(paid, Decimal::ZERO);
    assert_eq!(payments, 0);
}

#[tokio::test]
async fn crossed_admin_demotions_keep_one_admin() {
    let Some(pool) = common::test_pool().await else { return };
    let fx = common::seed_office(&pool).await;

    // Simula o outro admin rebaixando o primeiro ao mesmo tempo
    let mut holder = pool.begin().await.unwrap();
    sqlx::query("SELECT id FROM users WHERE office_id = $1 AND role = 'admin' AND is_active = TRUE FOR UPDATE")
        .bind(fx.office_id)
        .execute(&mut *holder)
        .await
        .unwrap();

    let pending = tokio::spawn({
        let pool = pool.clone();
        let service = user_service(&pool);
        let principal = fx.admin();
        let target = fx.second_admin_id;
        async move {
            let payload = UpdateUserPayload {
                role: Some(Role::Lawyer),
                ..Default::default()
            };
            service.update(&pool, &principal, target, &payload).await
        }
    });
    tokio::time::sleep(LOCK_WAIT).await;

    sqlx::query("UPDATE users SET role = 'lawyer' WHERE id = $1")
        .bind(fx.admin_id)
        .execute(&mut *holder)
        .await
        .unwrap();
    holder.commit().await.unwrap();

    let result = pending.await.unwrap();
    assert!(matches!(result, Err(AppError::DataIntegrityConflict(_))));

    let admins: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM users WHERE office_id = $1 AND role = 'admin' AND is_active = TRUE",
    )
    .bind(fx.office_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(admins, 1);
}

fn sweep(pool: &PgPool) -> ReminderSweep {
    let mailer = EmailDispatcher::new(Arc::new(LogEmailTransport), false, Duration::from_secs(1));
    ReminderSweep::new(Arc::new(PgSweepStore::new(pool.clone())), mailer)
}

async fn notifications_for(pool: &PgPool, user_id: Uuid, entity_id: Uuid) -> Vec<String> {
    sqlx::query_scalar("SELECT title FROM notifications WHERE user_id = $1 AND related_entity_id = $2")
        .bind(user_id)
        .bind(entity_id)
        .fetch_all(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn session_reminder_claim_marks_every_looser_bucket_once() {
    let Some(pool) = common::test_pool().await else { return };
    let fx = common::seed_office(&pool).await;
    let now = Utc::now();

    let session_id: Uuid = sqlx::query_scalar(
        "INSERT INTO court_sessions (office_id, case_id, session_date, created_by) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(fx.office_id)
    .bind(fx.case_id)
    .bind(now + ChronoDuration::minutes(90))
    .bind(fx.admin_id)
    .fetch_one(&pool)
    .await
    .unwrap();

    let sweep = sweep(&pool);
    let first = sweep.run_sessions(now, Some(fx.office_id)).await.unwrap();
    let second = sweep.run_sessions(now, Some(fx.office_id)).await.unwrap();

    assert_eq!(first.session_reminders, 1);
    assert_eq!(second.session_reminders, 0);

    let markers: Vec<String> = sqlx::query_scalar("SELECT sent_reminders FROM court_sessions WHERE id = $1")
        .bind(session_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(markers, vec!["7d", "3d", "24h", "2h"]);

    let titles = notifications_for(&pool, fx.lawyer_id, session_id).await;
    assert_eq!(titles, vec!["تذكير بجلسة قادمة".to_string()]);
}

#[tokio::test]
async fn overdue_task_claim_fires_once() {
    let Some(pool) = common::test_pool().await else { return };
    let fx = common::seed_office(&pool).await;
    let now = Utc::now();

    let task_id: Uuid = sqlx::query_scalar(
        "INSERT INTO tasks (office_id, title, assigned_to, due_date, created_by) VALUES ($1, 'مراجعة', $2, $3, $4) RETURNING id",
    )
    .bind(fx.office_id)
    .bind(fx.lawyer_id)
    .bind(now - ChronoDuration::hours(1))
    .bind(fx.admin_id)
    .fetch_one(&pool)
    .await
    .unwrap();

    let sweep = sweep(&pool);
    let first = sweep.run_tasks(now, Some(fx.office_id)).await.unwrap();
    let second = sweep.run_tasks(now, Some(fx.office_id)).await.unwrap();

    assert_eq!(first.task_alerts, 1);
    assert_eq!(second.task_alerts, 0);

    let sent: bool = sqlx::query_scalar("SELECT notification_sent FROM tasks WHERE id = $1")
        .bind(task_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert!(sent);
    assert_eq!(notifications_for(&pool, fx.lawyer_id, task_id).await.len(), 1);
}

#[tokio::test]
async fn assistant_can_be_removed_from_case() {
    let Some(pool) = common::test_pool().await else { return };
    let fx = common::seed_office(&pool).await;
    let service = CaseService::new(
        CaseRepository::new(),
        ActivityService::new(ActivityRepository::new(), pool.clone()),
        NotificationService::new(NotificationRepository::new(), pool.clone()),
    );

    let assign: UpdateCasePayload =
        serde_json::from_str(&format!(r#"{{"assistantLawyerId":"{}"}}"#, fx.second_admin_id)).unwrap();
    let case = service.update(&pool, &fx.admin(), fx.case_id, &assign).await.unwrap();
    assert_eq!(case.assistant_lawyer_id, Some(fx.second_admin_id));

    let clear: UpdateCasePayload = serde_json::from_str(r#"{"assistantLawyerId":null}"#).unwrap();
    let case = service.update(&pool, &fx.admin(), fx.case_id, &clear).await.unwrap();
    assert_eq!(case.assistant_lawyer_id, None);
    assert_eq!(case.lawyer_id, fx.lawyer_id);
}
