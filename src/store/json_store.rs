use super::record::TranscriptionRecord;
use super::TranscriptionStore;
use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::info;

/// Transcription history backed by a single JSON file.
///
/// Writes go through a temp file followed by an atomic rename so a crash
/// mid-write never leaves a truncated store. A mutex serializes writers;
/// individual record operations are atomic from the caller's view.
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<Vec<TranscriptionRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read store: {}", self.path.display()))?;
        let records: Vec<TranscriptionRecord> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse store: {}", self.path.display()))?;
        Ok(records)
    }

    fn save(&self, records: &[TranscriptionRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create dir: {}", parent.display()))?;
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_string_pretty(records)?)
            .with_context(|| format!("failed to write store temp: {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("failed to replace store: {}", self.path.display()))?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl TranscriptionStore for JsonFileStore {
    async fn insert(&self, record: TranscriptionRecord) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut records = self.load()?;
        records.push(record);
        self.save(&records)
    }

    async fn list(&self) -> Result<Vec<TranscriptionRecord>> {
        let mut records = self.load()?;
        // Newest first
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn get(&self, id: &str) -> Result<Option<TranscriptionRecord>> {
        Ok(self.load()?.into_iter().find(|r| r.id == id))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut records = self.load()?;
        let before = records.len();
        records.retain(|r| r.id != id);

        if records.len() == before {
            return Ok(false);
        }

        self.save(&records)?;
        info!("Deleted transcription {}", id);
        Ok(true)
    }

    async fn clear(&self) -> Result<usize> {
        let _guard = self.lock.lock().await;
        let records = self.load()?;
        let count = records.len();
        self.save(&[])?;
        info!("Cleared {} transcriptions", count);
        Ok(count)
    }
}
