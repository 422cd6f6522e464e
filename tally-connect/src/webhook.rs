//! Webhook notification channel.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use tally_core::notify::Notifier;

/// Posts `{subject, body}` to a configured webhook. Delivery is
/// best-effort: failures are logged and dropped, never propagated.
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            url: url.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, subject: &str, body: &str) {
        let result = self
            .client
            .post(&self.url)
            .json(&serde_json::json!({ "subject": subject, "body": body }))
            .send()
            .await
            .and_then(|r| r.error_for_status());

        match result {
            Ok(_) => debug!(subject, "Notification delivered"),
            Err(err) => warn!(subject, %err, "Notification delivery failed"),
        }
    }
}
