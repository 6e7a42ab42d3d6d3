// src/services/notification_service.rs

use std::{sync::Arc, time::Duration};

use sqlx::{Acquire, Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    access::Principal,
    common::{
        db_utils::{Page, PageQuery},
        error::AppError,
    },
    db::NotificationRepository,
    models::notification::{NewNotification, Notification, NotificationFilter, UnreadCount},
    services::email::{EmailMessage, EmailTransport},
};

// =============================================================================
//  ENVIO DE E-MAIL COM TEMPO LIMITADO
// =============================================================================

#[derive(Clone)]
pub struct EmailDispatcher {
    transport: Arc<dyn EmailTransport>,
    enabled: bool,
    timeout: Duration,
}

impl EmailDispatcher {
    pub fn new(transport: Arc<dyn EmailTransport>, enabled: bool, timeout: Duration) -> Self {
        Self { transport, enabled, timeout }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Um envio travado não segura quem chamou além de `timeout`.
    pub async fn send(&self, message: &EmailMessage) -> Result<bool, AppError> {
        match tokio::time::timeout(self.timeout, self.transport.send(message)).await {
            Ok(result) => result,
            Err(_) => Err(AppError::DispatchFailure(format!(
                "timeout de {}s enviando para {}",
                self.timeout.as_secs(),
                message.to
            ))),
        }
    }
}

// =============================================================================
//  NOTIFICAÇÕES DO USUÁRIO
// =============================================================================

#[derive(Clone)]
pub struct NotificationService {
    repo: NotificationRepository,
    pool: PgPool,
}

impl NotificationService {
    pub fn new(repo: NotificationRepository, pool: PgPool) -> Self {
        Self { repo, pool }
    }

    /// Notificação de evento (tarefa atribuída, processo atualizado...).
    /// Gravada em segundo plano depois do commit; falhar aqui só vai para o log.
    pub fn notify(&self, notification: NewNotification) {
        let repo = self.repo;
        let pool = self.pool.clone();
        tokio::spawn(async move {
            if let Err(e) = repo.insert(&pool, &notification).await {
                tracing::warn!(
                    user_id = %notification.user_id,
                    kind = ?notification.kind,
                    "falha ao gravar notificação: {:?}",
                    e
                );
            }
        });
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        filter: &NotificationFilter,
        page: &PageQuery,
    ) -> Result<Page<Notification>, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut conn = executor.acquire().await?;

        let items = self
            .repo
            .list(&mut *conn, principal.office_id, principal.user_id, filter, page)
            .await?;
        let total = self
            .repo
            .count(&mut *conn, principal.office_id, principal.user_id, filter)
            .await?;

        Ok(Page::new(items, total, page))
    }

    pub async fn unread_count<'e, E>(&self, executor: E, principal: &Principal) -> Result<UnreadCount, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let filter = NotificationFilter { unread_only: Some(true) };
        let unread = self
            .repo
            .count(executor, principal.office_id, principal.user_id, &filter)
            .await?;
        Ok(UnreadCount { unread })
    }

    pub async fn mark_read<'e, E>(&self, executor: E, principal: &Principal, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // Notificação de outro usuário (ou escritório) = inexistente
        let affected = self
            .repo
            .mark_read(executor, principal.office_id, principal.user_id, id)
            .await?;
        if affected == 0 {
            return Err(AppError::not_found(format!("notification {}", id)));
        }
        Ok(())
    }

    pub async fn mark_all_read<'e, E>(&self, executor: E, principal: &Principal) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        self.repo
            .mark_all_read(executor, principal.office_id, principal.user_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Stuck;

    #[async_trait]
    impl EmailTransport for Stuck {
        async fn send(&self, _message: &EmailMessage) -> Result<bool, AppError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(true)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_transport_is_cut_by_timeout() {
        let mailer = EmailDispatcher::new(Arc::new(Stuck), true, Duration::from_secs(10));
        let message = EmailMessage {
            to: "lawyer@office.com".into(),
            subject: "s".into(),
            text: "t".into(),
        };

        let result = mailer.send(&message).await;
        assert!(matches!(result, Err(AppError::DispatchFailure(_))));
    }
}
