//! Filesystem transfer channel.
//!
//! Each export file is delivered twice: once into the log archive and once
//! into the partner-facing drop folder. The wire protocol behind those
//! roots (FTP mount, synced share) is outside this crate's concern.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use tally_core::transfer::TransferChannel;
use tally_core::BoxError;

pub struct DropFolderTransfer {
    archive_root: PathBuf,
    partner_root: PathBuf,
    /// Partner folders whose files are produced but never delivered.
    excluded_folders: Vec<String>,
}

impl DropFolderTransfer {
    pub fn new(
        archive_root: impl Into<PathBuf>,
        partner_root: impl Into<PathBuf>,
        excluded_folders: Vec<String>,
    ) -> Self {
        Self {
            archive_root: archive_root.into(),
            partner_root: partner_root.into(),
            excluded_folders,
        }
    }

    /// Export paths look like `<root>/<partner_folder>/<stamp>/<file>`;
    /// the partner folder is the grandparent directory name.
    fn partner_folder(path: &Path) -> Result<String, BoxError> {
        path.parent()
            .and_then(Path::parent)
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| format!("cannot derive partner folder from {}", path.display()).into())
    }
}

#[async_trait]
impl TransferChannel for DropFolderTransfer {
    async fn upload(&self, paths: &[PathBuf]) -> Result<(), BoxError> {
        for path in paths {
            let folder = Self::partner_folder(path)?;
            if self.excluded_folders.contains(&folder) {
                debug!(%folder, "Partner excluded from transfer");
                continue;
            }

            let file_name = path
                .file_name()
                .ok_or_else(|| format!("not a file path: {}", path.display()))?;

            let destinations = [
                self.archive_root.join("invoice_logs").join(&folder),
                self.partner_root.join(&folder).join("invoices"),
            ];

            for dest_dir in destinations {
                tokio::fs::create_dir_all(&dest_dir).await?;
                tokio::fs::copy(path, dest_dir.join(file_name)).await?;
            }

            info!(%folder, file = %path.display(), "Export file delivered");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_to_archive_and_partner_folders() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();

        let run_dir = src.path().join("acme_drop").join("03022026_101500");
        std::fs::create_dir_all(&run_dir).unwrap();
        let file = run_dir.join("Invoice_03022026.csv");
        std::fs::write(&file, "po_number\n1001\n").unwrap();

        let transfer = DropFolderTransfer::new(
            dest.path().join("logs"),
            dest.path().join("partners"),
            vec![],
        );
        transfer.upload(&[file]).await.unwrap();

        assert!(dest
            .path()
            .join("logs/invoice_logs/acme_drop/Invoice_03022026.csv")
            .exists());
        assert!(dest
            .path()
            .join("partners/acme_drop/invoices/Invoice_03022026.csv")
            .exists());
    }

    #[tokio::test]
    async fn excluded_partner_is_skipped() {
        let src = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();

        let run_dir = src.path().join("house_brand").join("03022026_101500");
        std::fs::create_dir_all(&run_dir).unwrap();
        let file = run_dir.join("Invoice_03022026.csv");
        std::fs::write(&file, "po_number\n").unwrap();

        let transfer = DropFolderTransfer::new(
            dest.path().join("logs"),
            dest.path().join("partners"),
            vec!["house_brand".to_string()],
        );
        transfer.upload(&[file]).await.unwrap();

        assert!(!dest.path().join("logs").exists());
        assert!(!dest.path().join("partners").exists());
    }
}
