// src/services/email.rs

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

use crate::common::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text: String,
}

/// Transporte de e-mail. `Ok(false)` = recusado pelo provedor (não é erro de rede).
#[async_trait]
pub trait EmailTransport: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<bool, AppError>;
}

// ---
// Relay HTTP (qualquer provedor com API JSON: {from, to, subject, text})
// ---
pub struct HttpEmailTransport {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    from: String,
}

impl HttpEmailTransport {
    pub fn new(api_url: String, api_key: Option<String>, from: String, timeout: Duration) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::DispatchFailure(e.to_string()))?;

        Ok(Self { client, api_url, api_key, from })
    }
}

#[async_trait]
impl EmailTransport for HttpEmailTransport {
    async fn send(&self, message: &EmailMessage) -> Result<bool, AppError> {
        let mut request = self.client.post(&self.api_url).json(&json!({
            "from": self.from,
            "to": message.to,
            "subject": message.subject,
            "text": message.text,
        }));

        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::DispatchFailure(e.to_string()))?;

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), to = %message.to, "relay de e-mail recusou a mensagem");
            return Ok(false);
        }

        Ok(true)
    }
}

// ---
// Sem relay configurado: só registra no log
// ---
#[derive(Default)]
pub struct LogEmailTransport;

#[async_trait]
impl EmailTransport for LogEmailTransport {
    async fn send(&self, message: &EmailMessage) -> Result<bool, AppError> {
        tracing::info!(to = %message.to, subject = %message.subject, "📧 e-mail (somente log)");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn log_transport_always_accepts() {
        let transport = LogEmailTransport;
        let sent = transport
            .send(&EmailMessage {
                to: "lawyer@office.com".into(),
                subject: "تذكير بجلسة قادمة".into(),
                text: "...".into(),
            })
            .await
            .unwrap();
        assert!(sent);
    }
}
