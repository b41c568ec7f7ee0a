use super::state::AppState;
use crate::error::ServiceError;
use crate::pricing;
use crate::service::{AudioUpload, DiarizeOptions};
use crate::store::TranscriptionRecord;
use axum::{
    extract::{Multipart, Path, State},
    response::Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

// ============================================================================
// Wire Types
// ============================================================================

/// A transcription record as it travels over the API. Shared with the
/// client, which deserializes the same shape back.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionPayload {
    pub id: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,
    pub audio_url: String,
    pub timestamp: DateTime<Utc>,
    /// Spoken duration in seconds
    pub duration: f64,
    pub tokens: u64,
    pub duration_minutes: u64,
    pub usd_expended: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker_count: Option<usize>,
}

impl From<TranscriptionRecord> for TranscriptionPayload {
    fn from(record: TranscriptionRecord) -> Self {
        Self {
            id: record.id,
            text: record.text,
            original_text: record.original_text,
            audio_url: record.audio_url,
            timestamp: record.created_at,
            duration: record.duration_seconds,
            tokens: record.tokens_expended,
            duration_minutes: pricing::duration_minutes(record.duration_seconds),
            usd_expended: record.usd_expended,
            speaker_count: record.speaker_count,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TranscriptionResponse {
    pub success: bool,
    pub transcription: TranscriptionPayload,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    pub success: bool,
    pub transcriptions: Vec<TranscriptionPayload>,
    pub total: usize,
    pub total_tokens: u64,
    pub total_cost: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearResponse {
    pub success: bool,
    pub message: String,
    pub deleted_count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub services: HealthServices,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthServices {
    pub speech_to_text: bool,
    pub object_storage: bool,
}

/// Fields extracted from a multipart upload
struct UploadForm {
    upload: Option<AudioUpload>,
    speaker_count: Option<usize>,
    speaker_names: Vec<String>,
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, ServiceError> {
    let mut form = UploadForm {
        upload: None,
        speaker_count: None,
        speaker_names: Vec::new(),
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::InvalidInput(format!("malformed upload: {}", e)))?
    {
        match field.name() {
            Some("audio") => {
                let mime_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ServiceError::InvalidInput(format!("failed to read audio: {}", e)))?
                    .to_vec();
                form.upload = Some(AudioUpload { bytes, mime_type });
            }
            Some("speakerCount") => {
                let raw = field.text().await.map_err(|e| {
                    ServiceError::InvalidInput(format!("invalid speakerCount: {}", e))
                })?;
                form.speaker_count = raw.trim().parse::<usize>().ok();
            }
            Some("speakerNames") => {
                let raw = field.text().await.map_err(|e| {
                    ServiceError::InvalidInput(format!("invalid speakerNames: {}", e))
                })?;
                form.speaker_names = serde_json::from_str(&raw).map_err(|e| {
                    ServiceError::InvalidInput(format!("speakerNames must be a JSON list: {}", e))
                })?;
            }
            _ => {}
        }
    }

    Ok(form)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /transcribe
/// Plain transcription of one uploaded audio clip
pub async fn transcribe(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<TranscriptionResponse>, ServiceError> {
    let form = read_upload_form(multipart).await?;
    let upload = form
        .upload
        .ok_or_else(|| ServiceError::InvalidInput("No audio file provided".to_string()))?;

    let record = state.service.transcribe(upload).await?;

    Ok(Json(TranscriptionResponse {
        success: true,
        transcription: record.into(),
    }))
}

/// POST /diarize
/// Transcription plus speaker-turn labeling
pub async fn diarize(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<TranscriptionResponse>, ServiceError> {
    let form = read_upload_form(multipart).await?;
    let upload = form
        .upload
        .ok_or_else(|| ServiceError::InvalidInput("No audio file provided".to_string()))?;

    let options = DiarizeOptions {
        expected_speakers: form.speaker_count,
        speaker_names: form.speaker_names,
    };

    let record = state.service.diarize(upload, options).await?;

    Ok(Json(TranscriptionResponse {
        success: true,
        transcription: record.into(),
    }))
}

/// GET /transcriptions
/// Full history, newest first, with aggregate usage totals
pub async fn list_transcriptions(
    State(state): State<AppState>,
) -> Result<Json<ListResponse>, ServiceError> {
    let page = state.service.list().await?;

    Ok(Json(ListResponse {
        success: true,
        total: page.total,
        total_tokens: page.total_tokens,
        total_cost: page.total_cost,
        transcriptions: page.records.into_iter().map(Into::into).collect(),
    }))
}

/// DELETE /transcriptions/:id
pub async fn delete_transcription(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ServiceError> {
    state.service.delete(&id).await?;
    info!("Transcription {} deleted via API", id);

    Ok(Json(DeleteResponse {
        success: true,
        message: "Transcription deleted successfully".to_string(),
    }))
}

/// DELETE /transcriptions/clear
pub async fn clear_transcriptions(
    State(state): State<AppState>,
) -> Result<Json<ClearResponse>, ServiceError> {
    let deleted_count = state.service.clear_all().await?;

    Ok(Json(ClearResponse {
        success: true,
        message: format!("{} transcriptions deleted successfully", deleted_count),
        deleted_count,
    }))
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        services: HealthServices {
            speech_to_text: state.service.stt_configured(),
            object_storage: state.service.storage_configured(),
        },
    })
}
