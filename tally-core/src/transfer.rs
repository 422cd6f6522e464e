use std::path::PathBuf;

use async_trait::async_trait;

use crate::BoxError;

/// Delivers export files to their per-partner destinations (a log archive
/// and a partner-facing drop folder). A failed upload is terminal for the
/// run's transfer step; the caller composes the manual-intervention
/// notification from the returned error and the affected paths.
#[async_trait]
pub trait TransferChannel: Send + Sync {
    async fn upload(&self, paths: &[PathBuf]) -> Result<(), BoxError>;
}
