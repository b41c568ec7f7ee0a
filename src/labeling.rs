//! External conversational-labeling capability.
//!
//! A diarized request re-emits the raw transcript as speaker-attributed
//! `"<Label>: <utterance>"` lines. The language model behind this is an
//! opaque capability with a documented prompt/output contract; callers must
//! not assume its wording is stable and fall back to the raw transcript
//! when the call fails or returns nothing usable.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Result of one labeling call.
#[derive(Debug, Clone)]
pub struct LabelingOutcome {
    /// Labeled transcript; None when the model returned empty content
    pub text: Option<String>,
    /// Total tokens the call consumed
    pub tokens: u64,
}

#[async_trait::async_trait]
pub trait SpeakerLabeler: Send + Sync {
    async fn label(&self, transcript: &str, labels: &[String]) -> Result<LabelingOutcome>;
}

/// Target labels for a diarized request: the caller's names when supplied,
/// otherwise generated `Speaker 1..N` for the expected speaker count.
pub fn speaker_labels(expected_speakers: usize, names: &[String]) -> Vec<String> {
    if !names.is_empty() {
        return names.to_vec();
    }
    (1..=expected_speakers.max(2))
        .map(|n| format!("Speaker {}", n))
        .collect()
}

/// Labeling prompt: embeds the raw transcript and the exact labels the
/// model must use, one `"<Label>: <utterance>"` line per turn.
pub fn build_labeling_prompt(transcript: &str, labels: &[String]) -> String {
    let label_list = labels.join(", ");
    let example = labels
        .iter()
        .take(2)
        .map(|l| format!("   {}: [what they said]", l))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Please analyze this transcript and identify different speakers in the \
conversation. Format the output as a conversation with speaker labels.\n\n\
Transcript: \"{transcript}\"\n\n\
Instructions:\n\
1. Identify distinct speakers based on context, speaking patterns, and conversation flow\n\
2. Format as:\n{example}\n\
3. Use exactly these speaker labels: {label_list}\n\
4. Be consistent with speaker identification throughout\n\
5. Maintain the natural flow and meaning of the conversation, in order\n\
6. If uncertain about speaker changes, err on the side of fewer speaker transitions\n\n\
Please provide ONLY the formatted conversation output, no additional commentary."
    )
}

const SYSTEM_MESSAGE: &str = "You are an expert at identifying speakers in conversations \
and formatting transcripts with speaker diarization.";

#[derive(Debug, Clone)]
pub struct ChatLabelerConfig {
    pub api_key: String,
    pub model: String,
}

/// OpenAI chat-completions labeling backend.
pub struct ChatLabeler {
    config: ChatLabelerConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    total_tokens: u64,
}

impl ChatLabeler {
    pub fn new(config: ChatLabelerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("failed to build labeling HTTP client")?;

        Ok(Self { config, client })
    }
}

#[async_trait::async_trait]
impl SpeakerLabeler for ChatLabeler {
    async fn label(&self, transcript: &str, labels: &[String]) -> Result<LabelingOutcome> {
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_MESSAGE.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: build_labeling_prompt(transcript, labels),
                },
            ],
            temperature: 0.3,
            max_tokens: 2000,
        };

        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&request)
            .send()
            .await
            .context("labeling API request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("labeling API error: {} - {}", status, body);
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("failed to parse labeling API response")?;

        let tokens = parsed.usage.map(|u| u.total_tokens).unwrap_or(0);
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|t| !t.trim().is_empty());

        debug!("Labeling call used {} tokens", tokens);

        Ok(LabelingOutcome { text, tokens })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_numbered_labels_when_no_names_given() {
        let labels = speaker_labels(3, &[]);
        assert_eq!(labels, vec!["Speaker 1", "Speaker 2", "Speaker 3"]);
    }

    #[test]
    fn generates_at_least_two_labels() {
        assert_eq!(speaker_labels(0, &[]).len(), 2);
        assert_eq!(speaker_labels(1, &[]).len(), 2);
    }

    #[test]
    fn supplied_names_win_over_count() {
        let names = vec!["Ana".to_string(), "Luis".to_string()];
        assert_eq!(speaker_labels(4, &names), names);
    }

    #[test]
    fn prompt_embeds_transcript_and_labels() {
        let labels = speaker_labels(2, &[]);
        let prompt = build_labeling_prompt("hello there", &labels);
        assert!(prompt.contains("Transcript: \"hello there\""));
        assert!(prompt.contains("Speaker 1, Speaker 2"));
        assert!(prompt.contains("Speaker 1: [what they said]"));
    }
}
