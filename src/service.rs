//! Transcription request orchestration.
//!
//! One request-response cycle per upload, no shared mutable state beyond
//! the history store and blob storage: validate the upload, run the
//! speech-to-text capability, optionally run speaker labeling, compute
//! usage, store the blob best-effort, persist the record.

use crate::conversation;
use crate::error::ServiceError;
use crate::labeling::{self, SpeakerLabeler};
use crate::pricing;
use crate::storage::BlobStorage;
use crate::store::{TranscriptionRecord, TranscriptionStore};
use crate::stt::SpeechToText;
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};

/// An uploaded audio clip, as received from the HTTP layer.
#[derive(Debug, Clone)]
pub struct AudioUpload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Parameters of a diarized request.
#[derive(Debug, Clone, Default)]
pub struct DiarizeOptions {
    /// Expected speaker count hint (default 2)
    pub expected_speakers: Option<usize>,
    /// Optional ordered display names for the speakers
    pub speaker_names: Vec<String>,
}

pub struct TranscriptionService {
    stt: Option<Arc<dyn SpeechToText>>,
    labeler: Option<Arc<dyn SpeakerLabeler>>,
    storage: Option<Arc<dyn BlobStorage>>,
    store: Arc<dyn TranscriptionStore>,
}

impl TranscriptionService {
    pub fn new(
        stt: Option<Arc<dyn SpeechToText>>,
        labeler: Option<Arc<dyn SpeakerLabeler>>,
        storage: Option<Arc<dyn BlobStorage>>,
        store: Arc<dyn TranscriptionStore>,
    ) -> Self {
        Self {
            stt,
            labeler,
            storage,
            store,
        }
    }

    pub fn stt_configured(&self) -> bool {
        self.stt.is_some()
    }

    pub fn storage_configured(&self) -> bool {
        self.storage.is_some()
    }

    /// Plain transcription: STT, usage, best-effort blob upload, persist.
    pub async fn transcribe(
        &self,
        upload: AudioUpload,
    ) -> Result<TranscriptionRecord, ServiceError> {
        validate_upload(&upload)?;
        let stt = self
            .stt
            .as_ref()
            .ok_or(ServiceError::ServiceUnavailable("speech-to-text"))?;

        let filename = blob_filename(&upload.mime_type);
        let transcript = stt
            .transcribe(upload.bytes.clone(), &upload.mime_type, &filename)
            .await
            .map_err(|e| ServiceError::UpstreamFailure(format!("{:#}", e)))?;

        let usd_expended = pricing::request_cost_usd(transcript.duration_seconds, 0);
        let audio_url = self.store_blob(&filename, &upload.bytes).await;

        let record = TranscriptionRecord {
            id: uuid::Uuid::new_v4().to_string(),
            text: transcript.text,
            original_text: None,
            audio_url,
            created_at: Utc::now(),
            duration_seconds: transcript.duration_seconds,
            tokens_expended: 0,
            usd_expended,
            speaker_count: None,
        };

        self.store
            .insert(record.clone())
            .await
            .context("failed to persist transcription")?;

        info!(
            "Transcribed {:.1}s clip ({} chars)",
            record.duration_seconds,
            record.text.len()
        );
        Ok(record)
    }

    /// Diarized transcription: STT, then speaker labeling with the raw
    /// transcript as fallback, usage including labeling tokens, best-effort
    /// blob upload, persist.
    pub async fn diarize(
        &self,
        upload: AudioUpload,
        options: DiarizeOptions,
    ) -> Result<TranscriptionRecord, ServiceError> {
        validate_upload(&upload)?;
        let stt = self
            .stt
            .as_ref()
            .ok_or(ServiceError::ServiceUnavailable("speech-to-text"))?;
        let labeler = self
            .labeler
            .as_ref()
            .ok_or(ServiceError::ServiceUnavailable("speaker labeling"))?;

        let filename = blob_filename(&upload.mime_type);
        let transcript = stt
            .transcribe(upload.bytes.clone(), &upload.mime_type, &filename)
            .await
            .map_err(|e| ServiceError::UpstreamFailure(format!("{:#}", e)))?;

        let labels = labeling::speaker_labels(
            options.expected_speakers.unwrap_or(2),
            &options.speaker_names,
        );

        // The labeling capability is best-effort: on failure or empty
        // output the raw transcript stands.
        let (labeled_text, tokens) = match labeler.label(&transcript.text, &labels).await {
            Ok(outcome) => {
                let tokens = outcome.tokens;
                match outcome.text {
                    Some(text) => (text, tokens),
                    None => {
                        warn!("Labeling returned empty content, using raw transcript");
                        (transcript.text.clone(), tokens)
                    }
                }
            }
            Err(e) => {
                warn!("Labeling call failed, using raw transcript: {:#}", e);
                (transcript.text.clone(), 0)
            }
        };

        let usd_expended = pricing::request_cost_usd(transcript.duration_seconds, tokens);
        let audio_url = self.store_blob(&filename, &upload.bytes).await;
        let speaker_count = conversation::present_speaker_count(&labeled_text, &labels);

        let record = TranscriptionRecord {
            id: uuid::Uuid::new_v4().to_string(),
            text: labeled_text,
            original_text: Some(transcript.text),
            audio_url,
            created_at: Utc::now(),
            duration_seconds: transcript.duration_seconds,
            tokens_expended: tokens,
            usd_expended,
            speaker_count: Some(speaker_count),
        };

        self.store
            .insert(record.clone())
            .await
            .context("failed to persist transcription")?;

        info!(
            "Diarized {:.1}s clip: {} speakers, {} tokens",
            record.duration_seconds, speaker_count, tokens
        );
        Ok(record)
    }

    /// All records newest-first, with history-wide usage totals.
    pub async fn list(&self) -> Result<HistoryPage, ServiceError> {
        let records = self.store.list().await.context("failed to list history")?;
        let total_tokens = records.iter().map(|r| r.tokens_expended).sum();
        let total_cost = records.iter().map(|r| r.usd_expended).sum();
        Ok(HistoryPage {
            total: records.len(),
            total_tokens,
            total_cost,
            records,
        })
    }

    /// Delete one record, removing its stored audio first.
    ///
    /// Blob deletion is best-effort: a storage failure is logged drift and
    /// never blocks removal of the record itself.
    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let record = self
            .store
            .get(id)
            .await
            .context("failed to look up transcription")?
            .ok_or_else(|| ServiceError::NotFound(id.to_string()))?;

        self.delete_blob(&record.audio_url).await;

        let removed = self
            .store
            .delete(id)
            .await
            .context("failed to delete transcription")?;
        if !removed {
            return Err(ServiceError::NotFound(id.to_string()));
        }
        Ok(())
    }

    /// Delete every record and its stored audio, returning the count
    /// removed.
    ///
    /// Blob deletions fan out concurrently with per-blob error isolation;
    /// the store is cleared only after every outcome has been observed.
    pub async fn clear_all(&self) -> Result<usize, ServiceError> {
        let records = self.store.list().await.context("failed to list history")?;

        let deletions = records
            .iter()
            .map(|record| self.delete_blob(&record.audio_url));
        futures::future::join_all(deletions).await;

        let count = self.store.clear().await.context("failed to clear history")?;
        Ok(count)
    }

    async fn store_blob(&self, filename: &str, bytes: &[u8]) -> String {
        let Some(storage) = &self.storage else {
            return String::new();
        };
        match storage.put(filename, bytes).await {
            Ok(url) => url,
            Err(e) => {
                error!("Blob upload failed, continuing without audio URL: {:#}", e);
                String::new()
            }
        }
    }

    async fn delete_blob(&self, url: &str) {
        if url.is_empty() {
            return;
        }
        let Some(storage) = &self.storage else {
            return;
        };
        if let Err(e) = storage.delete(url).await {
            error!("Blob deletion failed for {}: {:#}", url, e);
        }
    }
}

/// One page of history with aggregate usage.
#[derive(Debug, Clone)]
pub struct HistoryPage {
    pub records: Vec<TranscriptionRecord>,
    pub total: usize,
    pub total_tokens: u64,
    pub total_cost: f64,
}

fn validate_upload(upload: &AudioUpload) -> Result<(), ServiceError> {
    if upload.bytes.is_empty() {
        return Err(ServiceError::InvalidInput(
            "No audio file provided".to_string(),
        ));
    }
    if !upload.mime_type.starts_with("audio/") {
        return Err(ServiceError::InvalidInput(
            "File must be an audio file".to_string(),
        ));
    }
    Ok(())
}

fn blob_filename(mime_type: &str) -> String {
    let extension = match mime_type.split(';').next().unwrap_or_default() {
        "audio/wav" | "audio/x-wav" => "wav",
        "audio/webm" => "webm",
        "audio/mpeg" => "mp3",
        "audio/ogg" => "ogg",
        _ => "bin",
    };
    format!("audio-{}.{}", uuid::Uuid::new_v4(), extension)
}
