use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Persisted result of one transcription or diarization request.
///
/// Created by the transcription service on success, immutable afterwards
/// except for deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionRecord {
    /// Server-assigned opaque id
    pub id: String,

    /// Final transcript, speaker-labeled for diarized requests
    pub text: String,

    /// Unlabeled transcript, present only for diarized results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,

    /// Public URL of the stored audio blob, empty if storage failed
    pub audio_url: String,

    pub created_at: DateTime<Utc>,

    /// Spoken duration reported by the speech-to-text capability
    pub duration_seconds: f64,

    /// Labeling tokens spent (0 for plain transcription)
    pub tokens_expended: u64,

    /// Estimated total cost of the request
    pub usd_expended: f64,

    /// Distinct configured labels present in the final text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker_count: Option<usize>,
}
