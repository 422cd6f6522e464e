use std::process::ExitCode;
use std::sync::Arc;

use tally_connect::WebhookNotifier;
use tally_core::notify::Notifier;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod report;
mod run;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    "tally_cli=info,tally_recon=info,tally_store=info,tally_connect=info".into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = tally_store::app_config::Config::load().expect("Failed to load config");
    let notifier: Arc<dyn Notifier> =
        Arc::new(WebhookNotifier::new(config.notifier.webhook_url.clone()));

    match run::run(&config, notifier.clone()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(?err, "Invoicing run failed");
            // Exactly one failure notification, then a non-zero exit. The
            // per-order boundary never swallows errors into this path.
            notifier
                .notify("Invoicing run failed", &format!("Error: {err:?}"))
                .await;
            ExitCode::FAILURE
        }
    }
}
