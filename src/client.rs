//! Client for the transcription API.
//!
//! Packages a captured clip into a multipart upload, dispatches it to the
//! plain or diarized endpoint, and normalizes the response into a
//! `TranscriptionRecord`. One request in flight per submission; the caller
//! serializes submissions for the same captured audio.

use crate::capture::CapturedAudio;
use crate::error::ErrorBody;
use crate::http::{
    ClearResponse, DeleteResponse, HealthResponse, ListResponse, TranscriptionResponse,
};
use crate::store::TranscriptionRecord;
use reqwest::multipart;
use serde::de::DeserializeOwned;

/// Submission failure with a user-displayable message. The captured audio
/// survives on the caller's side, so a retry needs no re-recording.
#[derive(Debug, thiserror::Error)]
pub enum TranscriptionRequestError {
    #[error("could not reach the transcription server: {0}")]
    Network(#[from] reqwest::Error),

    /// The server rejected the request; carries its error message
    #[error("{0}")]
    Rejected(String),

    #[error("invalid response from transcription service")]
    MalformedResponse,
}

/// Options for one submission.
#[derive(Debug, Clone, Default)]
pub struct SubmitOptions {
    pub diarize: bool,
    /// Expected speaker count, at least 2 to be meaningful
    pub expected_speakers: Option<usize>,
    /// Ordered speaker display names
    pub speaker_names: Vec<String>,
}

pub struct TranscriptionClient {
    base_url: String,
    client: reqwest::Client,
}

impl TranscriptionClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Upload a captured clip and return the normalized record.
    pub async fn submit(
        &self,
        audio: &CapturedAudio,
        options: &SubmitOptions,
    ) -> Result<TranscriptionRecord, TranscriptionRequestError> {
        let filename = format!("recording-{}.wav", uuid::Uuid::new_v4());
        let part = multipart::Part::bytes(audio.bytes.clone())
            .file_name(filename)
            .mime_str(&audio.mime_type)
            .map_err(|_| TranscriptionRequestError::MalformedResponse)?;

        let mut form = multipart::Form::new().part("audio", part);

        let endpoint = if options.diarize {
            if let Some(count) = options.expected_speakers {
                form = form.text("speakerCount", count.to_string());
            }
            if !options.speaker_names.is_empty() {
                let names = serde_json::to_string(&options.speaker_names)
                    .map_err(|_| TranscriptionRequestError::MalformedResponse)?;
                form = form.text("speakerNames", names);
            }
            "/diarize"
        } else {
            "/transcribe"
        };

        let response = self
            .client
            .post(self.url(endpoint))
            .multipart(form)
            .send()
            .await?;

        let body: TranscriptionResponse = parse_response(response).await?;
        if !body.success {
            return Err(TranscriptionRequestError::MalformedResponse);
        }

        let payload = body.transcription;
        Ok(TranscriptionRecord {
            id: payload.id,
            text: payload.text,
            original_text: payload.original_text,
            audio_url: payload.audio_url,
            created_at: payload.timestamp,
            duration_seconds: payload.duration,
            tokens_expended: payload.tokens,
            usd_expended: payload.usd_expended,
            speaker_count: payload.speaker_count,
        })
    }

    pub async fn list(&self) -> Result<ListResponse, TranscriptionRequestError> {
        let response = self.client.get(self.url("/transcriptions")).send().await?;
        parse_response(response).await
    }

    pub async fn delete(&self, id: &str) -> Result<DeleteResponse, TranscriptionRequestError> {
        let response = self
            .client
            .delete(self.url(&format!("/transcriptions/{}", id)))
            .send()
            .await?;
        parse_response(response).await
    }

    pub async fn clear(&self) -> Result<ClearResponse, TranscriptionRequestError> {
        let response = self
            .client
            .delete(self.url("/transcriptions/clear"))
            .send()
            .await?;
        parse_response(response).await
    }

    pub async fn health(&self) -> Result<HealthResponse, TranscriptionRequestError> {
        let response = self.client.get(self.url("/health")).send().await?;
        parse_response(response).await
    }
}

async fn parse_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, TranscriptionRequestError> {
    if !response.status().is_success() {
        // Prefer the server's own message when the error body is intact
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => "transcription request failed".to_string(),
        };
        return Err(TranscriptionRequestError::Rejected(message));
    }

    response
        .json()
        .await
        .map_err(|_| TranscriptionRequestError::MalformedResponse)
}
