//! Transcription history persistence.
//!
//! The store owns `TranscriptionRecord`s: append on successful requests,
//! list newest-first, delete one, or clear all. Blob cleanup for deleted
//! records is the service layer's concern, not the store's.

mod json_store;
mod record;

pub use json_store::JsonFileStore;
pub use record::TranscriptionRecord;

use anyhow::Result;

#[async_trait::async_trait]
pub trait TranscriptionStore: Send + Sync {
    async fn insert(&self, record: TranscriptionRecord) -> Result<()>;

    /// All records, ordered by creation time descending.
    async fn list(&self) -> Result<Vec<TranscriptionRecord>>;

    async fn get(&self, id: &str) -> Result<Option<TranscriptionRecord>>;

    /// Returns false if the id does not exist.
    async fn delete(&self, id: &str) -> Result<bool>;

    /// Removes every record, returning the count removed.
    async fn clear(&self) -> Result<usize>;
}
