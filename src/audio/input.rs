use anyhow::Result;
use tokio::sync::mpsc;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Configuration for an audio input device
#[derive(Debug, Clone)]
pub struct InputConfig {
    /// Requested sample rate (the device's native rate wins if unsupported)
    pub sample_rate: u32,
    /// Requested channel count (1 = mono)
    pub channels: u16,
    /// Echo cancellation hint, honored where the platform supports it
    pub echo_cancellation: bool,
    /// Noise suppression hint, honored where the platform supports it
    pub noise_suppression: bool,
    /// Frame size in milliseconds delivered per channel message
    pub frame_duration_ms: u64,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 1,
            echo_cancellation: true,
            noise_suppression: true,
            frame_duration_ms: 100,
        }
    }
}

/// Exclusive handle on one live audio input device.
///
/// `start` opens the device and delivers frames over a channel until `stop`
/// releases it. Dropping the returned receiver does not release the device;
/// only `stop` does, and it must be called exactly once per open handle.
#[async_trait::async_trait]
pub trait AudioInput: Send {
    /// Open the device and start delivering frames.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, super::CaptureError>;

    /// Release the device (stop all underlying tracks).
    async fn stop(&mut self) -> Result<()>;

    /// Whether the device is currently open
    fn is_open(&self) -> bool;

    /// Input name for logging
    fn name(&self) -> &str;
}

/// Opens audio inputs. Seam for tests, which substitute scripted inputs
/// for real hardware.
pub trait InputFactory: Send + Sync {
    fn open(&self, config: &InputConfig) -> Box<dyn AudioInput>;
}
