//! Operator notifications
//!
//! Fire-and-forget messages about failed jobs. A notifier's own failure is
//! logged and swallowed; it never propagates back into the scheduler.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

/// Notification channel for job failures
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a short text message, best effort
    async fn notify(&self, text: &str);
}

/// Notifier that only logs
#[derive(Debug, Default)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn notify(&self, text: &str) {
        debug!(%text, "NullNotifier::notify: dropping message");
    }
}

/// Telegram bot channel
pub struct TelegramNotifier {
    http: reqwest::Client,
    bot_token: String,
    chat_id: String,
}

impl TelegramNotifier {
    /// Create a notifier posting to the given chat
    pub fn new(bot_token: impl Into<String>, chat_id: impl Into<String>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            http,
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
        })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, text: &str) {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
        });

        match self.http.post(&url).json(&body).send().await {
            Ok(response) if response.status().is_success() => {
                debug!("TelegramNotifier::notify: delivered");
            }
            Ok(response) => {
                warn!(status = response.status().as_u16(), "TelegramNotifier::notify: delivery rejected");
            }
            Err(e) => {
                warn!(error = %e, "TelegramNotifier::notify: delivery failed");
            }
        }
    }
}
