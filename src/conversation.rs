//! Conversation transcript parsing and rendering support.
//!
//! Diarized transcripts arrive as flat text with one `"<Label>: <utterance>"`
//! line per speaker turn. This module decides whether a transcript is a
//! conversation at all, splits it into attributed turns, and assigns each
//! distinct speaker a stable palette color for display.

use regex_lite::Regex;

/// One parsed line of a conversation transcript.
///
/// Derived transiently from a record's text; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    /// Speaker label, absent for continuation/system lines like "(pause)"
    pub speaker: Option<String>,
    /// Utterance text, non-empty after trimming
    pub content: String,
}

impl ConversationTurn {
    pub fn is_continuation(&self) -> bool {
        self.speaker.is_none()
    }
}

/// True iff the text contains at least one `token:` speaker marker.
pub fn is_multi_speaker(text: &str) -> bool {
    let marker = Regex::new(r"\w+\s*:").unwrap();
    marker.is_match(text)
}

/// Split a flat transcript into speaker-attributed turns.
///
/// Blank lines are dropped. A line matching `"<label>: <rest>"` (label =
/// everything before the first colon) becomes an attributed turn; anything
/// else becomes a continuation turn. Turns with empty content are dropped.
pub fn parse(text: &str) -> Vec<ConversationTurn> {
    let line_pattern = Regex::new(r"^([^:]+):\s*(.*)$").unwrap();

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let turn = match line_pattern.captures(line) {
                Some(caps) => ConversationTurn {
                    speaker: Some(caps[1].trim().to_string()),
                    content: caps[2].trim().to_string(),
                },
                None => ConversationTurn {
                    speaker: None,
                    content: line.to_string(),
                },
            };
            if turn.content.is_empty() {
                None
            } else {
                Some(turn)
            }
        })
        .collect()
}

/// Distinct speakers in order of first appearance.
///
/// Identity is case-insensitive ("ANA" and "ana" are one speaker); the
/// casing of the first occurrence is kept for display.
pub fn distinct_speakers(turns: &[ConversationTurn]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut speakers = Vec::new();

    for turn in turns {
        if let Some(label) = &turn.speaker {
            let key = label.to_lowercase();
            if !seen.contains(&key) {
                seen.push(key);
                speakers.push(label.clone());
            }
        }
    }

    speakers
}

/// Count of distinct labels from `labels` actually present in `text` as a
/// leading `"<label>:"` marker, matched case-insensitively.
///
/// This is the unified `speaker_count` contract: labels the service
/// configured (or generated) that the labeling model actually used.
pub fn present_speaker_count(text: &str, labels: &[String]) -> usize {
    let lowered = text.to_lowercase();
    labels
        .iter()
        .filter(|label| lowered.contains(&format!("{}:", label.to_lowercase())))
        .count()
}

/// Fixed display palette, cycled when a conversation has more speakers
/// than entries. Order matches first-appearance order of the speakers.
pub const SPEAKER_PALETTE: [&str; 8] = [
    "blue", "green", "purple", "orange", "pink", "indigo", "teal", "rose",
];

/// Stable palette color for the speaker at first-appearance `index`.
pub fn speaker_color(index: usize) -> &'static str {
    SPEAKER_PALETTE[index % SPEAKER_PALETTE.len()]
}

/// Trailing summary shown after a rendered conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSummary {
    pub speaker_count: usize,
    pub speakers: Vec<String>,
}

pub fn summarize(turns: &[ConversationTurn]) -> ConversationSummary {
    let speakers = distinct_speakers(turns);
    ConversationSummary {
        speaker_count: speakers.len(),
        speakers,
    }
}
