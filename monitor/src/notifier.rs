use crate::error::NotifyError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument, warn};

const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Delivers a message to one recipient.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str, recipient: i64) -> Result<(), NotifyError>;
}

/// Sends `message` to every recipient. A failed delivery is logged and does
/// not stop the remaining ones. Returns the number of successful deliveries.
pub async fn broadcast(notifier: &dyn Notifier, recipients: &[i64], message: &str) -> usize {
    let mut delivered = 0;
    for &recipient in recipients {
        match notifier.send(message, recipient).await {
            Ok(()) => delivered += 1,
            Err(e) => warn!(recipient, "Failed to send notification: {}", e),
        }
    }
    delivered
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Telegram Bot API `sendMessage` client.
pub struct TelegramNotifier {
    client: reqwest::Client,
    send_url: String,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, timeout: Duration) -> Result<Self, NotifyError> {
        Self::with_api_base(TELEGRAM_API_BASE, bot_token, timeout)
    }

    pub fn with_api_base(
        api_base: &str,
        bot_token: &str,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            send_url: format!(
                "{}/bot{}/sendMessage",
                api_base.trim_end_matches('/'),
                bot_token
            ),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    #[instrument(skip(self, message))]
    async fn send(&self, message: &str, recipient: i64) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.send_url)
            .json(&SendMessageRequest {
                chat_id: recipient,
                text: message,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            // Error bodies are not always JSON, e.g. a proxy's HTML 502 page.
            let description = response
                .json::<SendMessageResponse>()
                .await
                .ok()
                .and_then(|body| body.description);
            return Err(NotifyError::Rejected(
                description.unwrap_or_else(|| format!("status {}", status)),
            ));
        }

        let body: SendMessageResponse = response.json().await?;
        if !body.ok {
            return Err(NotifyError::Rejected(
                body.description.unwrap_or_else(|| "ok: false".to_string()),
            ));
        }
        Ok(())
    }
}

/// Used when no bot token is configured: messages only reach the log.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &str, recipient: i64) -> Result<(), NotifyError> {
        info!(recipient, "Notification (no bot configured): {}", message);
        Ok(())
    }
}
