//! Best-effort mutation notifications.
//!
//! Route switches are reported to an incoming-webhook channel. Delivery is
//! fire-and-forget: a notification failure never affects the mutation it
//! reports, so every error ends at a log line here.

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info, warn};

/// Notification sink for mutation summaries.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Pushes `message` to the channel. Infallible by contract; failures
    /// are logged and swallowed by implementations.
    async fn notify(&self, message: &str);
}

/// Builds the webhook payload. The message is wrapped in backticks so the
/// channel renders it as a code block.
fn payload(message: &str) -> serde_json::Value {
    json!({ "text": format!("`{message}`") })
}

/// [`Notifier`] posting to an incoming webhook. A notifier without a URL is
/// valid and drops every message.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: Option<String>,
}

impl WebhookNotifier {
    /// Creates a notifier for `url`; `None` disables notifications.
    pub fn new(url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, message: &str) {
        let Some(url) = &self.url else {
            debug!("No webhook configured, dropping notification");
            return;
        };

        let response = self.client.post(url).json(&payload(message)).send().await;

        match response {
            Ok(response) => match response.text().await {
                Ok(body) => info!("Notification response: {}", body),
                Err(err) => warn!("Failed to read notification response: {}", err),
            },
            Err(err) => warn!("Failed to send notification: {}", err),
        }
    }
}
