use async_trait::async_trait;

/// Fire-and-forget notification channel. Implementations log and swallow
/// their own delivery failures; callers never handle them.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, subject: &str, body: &str);
}

/// Drops every notification after logging it. Useful for dry runs.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, subject: &str, body: &str) {
        tracing::info!(subject, body, "notification");
    }
}
