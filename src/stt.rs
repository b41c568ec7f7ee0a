//! External speech-to-text capability.
//!
//! Treated as a black box: audio bytes in, transcript text plus spoken
//! duration out. The production implementation calls the OpenAI Whisper
//! transcription endpoint.

use anyhow::{Context, Result};
use reqwest::multipart;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Detailed transcription output from the capability.
#[derive(Debug, Clone)]
pub struct Transcript {
    pub text: String,
    /// Total spoken duration in seconds; 0 if the capability omitted it
    pub duration_seconds: f64,
}

#[async_trait::async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, audio: Vec<u8>, mime_type: &str, filename: &str)
        -> Result<Transcript>;
}

#[derive(Debug, Clone)]
pub struct WhisperConfig {
    pub api_key: String,
    pub model: String,
    pub language: Option<String>,
}

/// OpenAI Whisper backend.
pub struct WhisperClient {
    config: WhisperConfig,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct WhisperResponse {
    text: String,
    #[serde(default)]
    duration: Option<f64>,
}

impl WhisperClient {
    pub fn new(config: WhisperConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("failed to build Whisper HTTP client")?;

        Ok(Self { config, client })
    }
}

#[async_trait::async_trait]
impl SpeechToText for WhisperClient {
    async fn transcribe(
        &self,
        audio: Vec<u8>,
        mime_type: &str,
        filename: &str,
    ) -> Result<Transcript> {
        let part = multipart::Part::bytes(audio)
            .file_name(filename.to_string())
            .mime_str(mime_type)?;

        let mut form = multipart::Form::new()
            .part("file", part)
            .text("model", self.config.model.clone())
            .text("response_format", "verbose_json")
            .text("temperature", "0.2");

        if let Some(language) = &self.config.language {
            form = form.text("language", language.clone());
        }

        let response = self
            .client
            .post("https://api.openai.com/v1/audio/transcriptions")
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .multipart(form)
            .send()
            .await
            .context("Whisper API request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Whisper API error: {} - {}", status, body);
        }

        let parsed: WhisperResponse = response
            .json()
            .await
            .context("failed to parse Whisper API response")?;

        debug!(
            "Whisper transcribed {:.1}s of audio",
            parsed.duration.unwrap_or(0.0)
        );

        Ok(Transcript {
            text: parsed.text,
            duration_seconds: parsed.duration.unwrap_or(0.0),
        })
    }
}
