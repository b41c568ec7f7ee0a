//! Audio input abstractions.
//!
//! `AudioInput` is the exclusive handle on one live input device; the cpal
//! implementation keeps the non-`Send` stream on a dedicated thread and
//! forwards PCM frames over a channel. `encode` assembles captured PCM into
//! an uploadable WAV clip.

pub mod cpal_input;
pub mod encode;
pub mod input;

pub use cpal_input::{CpalInput, CpalInputFactory};
pub use input::{AudioFrame, AudioInput, InputConfig, InputFactory};

/// Client-side capture failures, presented directly to the user.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    /// Microphone permission was denied. Recoverable: the user can grant
    /// access and try again.
    #[error("microphone access denied: {0}. Please grant microphone permissions")]
    PermissionDenied(String),

    #[error("audio input unavailable: {0}")]
    DeviceUnavailable(String),

    /// Operation not valid in the current recording state
    #[error("invalid capture state: expected {0}")]
    InvalidState(&'static str),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
