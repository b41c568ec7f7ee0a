//! Client-side recording: the capture state machine and the level meter.

mod controller;
mod level;

pub use controller::{CaptureController, CapturePhase, CapturedAudio};
pub use level::{LevelBand, LevelFrame, LevelMeter, WINDOW};
