//! Durable blob storage for uploaded audio.
//!
//! Storage is never on the critical path of producing a transcript: callers
//! treat `put` and `delete` failures as logged drift (empty audio URL,
//! orphaned blob) rather than request failures.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::info;

#[async_trait::async_trait]
pub trait BlobStorage: Send + Sync {
    /// Store a blob and return its public URL.
    async fn put(&self, filename: &str, bytes: &[u8]) -> Result<String>;

    /// Delete the blob behind a previously returned URL.
    async fn delete(&self, url: &str) -> Result<()>;
}

/// Filesystem-backed storage, served over HTTP from the recordings
/// directory. URLs are `<public_url>/recordings/<filename>`.
pub struct FsBlobStorage {
    root: PathBuf,
    public_url: String,
}

impl FsBlobStorage {
    pub fn new(root: impl Into<PathBuf>, public_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_url: public_url.into(),
        }
    }

    fn path_for(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }
}

#[async_trait::async_trait]
impl BlobStorage for FsBlobStorage {
    async fn put(&self, filename: &str, bytes: &[u8]) -> Result<String> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("failed to create recordings dir: {}", self.root.display()))?;

        let path = self.path_for(filename);
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("failed to write blob: {}", path.display()))?;

        let url = format!(
            "{}/recordings/{}",
            self.public_url.trim_end_matches('/'),
            filename
        );
        info!("Stored audio blob: {}", url);
        Ok(url)
    }

    async fn delete(&self, url: &str) -> Result<()> {
        // URLs are opaque to callers; only the trailing filename maps back
        // to disk.
        let filename = url
            .rsplit('/')
            .next()
            .filter(|name| !name.is_empty())
            .with_context(|| format!("blob URL has no filename: {}", url))?;

        let path = self.path_for(filename);
        tokio::fs::remove_file(&path)
            .await
            .with_context(|| format!("failed to delete blob: {}", path.display()))?;
        info!("Deleted audio blob: {}", url);
        Ok(())
    }
}
