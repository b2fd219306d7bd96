use serde::{Deserialize, Serialize};

use crate::config::NotifyConfig;

/// Payload posted to the chat webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub channel: String,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct Notifier {
    config: NotifyConfig,
    client: reqwest::Client,
}

impl Notifier {
    pub fn new(config: &NotifyConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            config: config.clone(),
            client,
        }
    }

    pub fn message(&self, text: impl Into<String>) -> NotificationMessage {
        NotificationMessage {
            channel: self.config.channel.clone(),
            text: text.into(),
        }
    }

    pub async fn send(&self, message: &NotificationMessage) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.config.hook_url)
            .json(message)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NotifyError::Timeout
                } else {
                    NotifyError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("").to_string();
            return Err(NotifyError::Http {
                status: status.as_u16(),
                reason,
            });
        }
        Ok(())
    }

    /// Best-effort delivery: failures are logged and never reach the caller.
    pub async fn notify(&self, message: &NotificationMessage) -> bool {
        match self.send(message).await {
            Ok(()) => {
                tracing::info!(channel = %message.channel, "Message posted");
                true
            }
            Err(NotifyError::Http { status, reason }) => {
                tracing::error!(status, reason = %reason, "Request failed");
                false
            }
            Err(e) => {
                tracing::error!(error = %e, "Server connection failed");
                false
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("webhook request timed out")]
    Timeout,
    #[error("webhook network error: {0}")]
    Network(String),
    #[error("webhook returned status={status} {reason}")]
    Http { status: u16, reason: String },
}
