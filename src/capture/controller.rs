use crate::audio::{
    encode, AudioFrame, AudioInput, CaptureError, InputConfig, InputFactory,
};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Observable phase of the capture state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapturePhase {
    /// No device open, nothing captured
    Idle,
    /// Mic open for level checking, not buffering
    Testing,
    /// Mic open, chunks accumulating, timer ticking
    Recording,
    /// Mic closed, a finished clip is ready to submit or discard
    Captured,
}

/// A finished recording, assembled from all buffered fragments.
#[derive(Debug, Clone)]
pub struct CapturedAudio {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub duration_seconds: f64,
}

/// Owns the microphone lifecycle: `Idle → Testing → Recording → Captured`.
///
/// At most one device handle is open at any time. Starting a recording
/// while testing reuses the already-open handle instead of acquiring a
/// second one, and every transition out of an open state releases the
/// device exactly once.
pub struct CaptureController {
    factory: Box<dyn InputFactory>,
    config: InputConfig,
    state: State,
}

enum State {
    Idle,
    /// Device open; `recording` distinguishes Testing from Recording
    Open {
        input: Box<dyn AudioInput>,
        pump: JoinHandle<Option<(u32, u16)>>,
        buffer: Arc<Mutex<Vec<i16>>>,
        elapsed: Arc<AtomicU64>,
        recording: Arc<AtomicBool>,
        monitor_rx: Option<mpsc::Receiver<AudioFrame>>,
    },
    Captured {
        audio: CapturedAudio,
    },
}

impl CaptureController {
    pub fn new(factory: Box<dyn InputFactory>, config: InputConfig) -> Self {
        Self {
            factory,
            config,
            state: State::Idle,
        }
    }

    pub fn phase(&self) -> CapturePhase {
        match &self.state {
            State::Idle => CapturePhase::Idle,
            State::Open { recording, .. } => {
                if recording.load(Ordering::SeqCst) {
                    CapturePhase::Recording
                } else {
                    CapturePhase::Testing
                }
            }
            State::Captured { .. } => CapturePhase::Captured,
        }
    }

    /// Seconds of audio buffered so far, ticking once per completed second
    /// while recording.
    pub fn elapsed_seconds(&self) -> u64 {
        match &self.state {
            State::Idle => 0,
            State::Open { elapsed, .. } => elapsed.load(Ordering::SeqCst),
            State::Captured { audio } => audio.duration_seconds as u64,
        }
    }

    /// The finished clip, if any.
    pub fn captured(&self) -> Option<&CapturedAudio> {
        match &self.state {
            State::Captured { audio } => Some(audio),
            _ => None,
        }
    }

    /// Live frame feed for the level visualizer. Available once per open
    /// device; read-only with respect to capture.
    pub fn take_monitor(&mut self) -> Option<mpsc::Receiver<AudioFrame>> {
        match &mut self.state {
            State::Open { monitor_rx, .. } => monitor_rx.take(),
            _ => None,
        }
    }

    /// `Idle → Testing`: open the mic for level checking.
    ///
    /// On permission denial or device failure the controller remains in
    /// `Idle` and the error is user-facing and recoverable.
    pub async fn start_testing(&mut self) -> Result<(), CaptureError> {
        if !matches!(self.state, State::Idle) {
            return Err(CaptureError::InvalidState("idle"));
        }
        self.open_device(false).await
    }

    /// `Idle → Recording` or `Testing → Recording`.
    ///
    /// From `Testing`, the open handle is reused; no second device request
    /// is made. The chunk buffer and elapsed counter reset either way.
    pub async fn start_recording(&mut self) -> Result<(), CaptureError> {
        match &mut self.state {
            State::Idle => self.open_device(true).await,
            State::Open {
                buffer,
                elapsed,
                recording,
                ..
            } => {
                if recording.load(Ordering::SeqCst) {
                    return Err(CaptureError::InvalidState("idle or testing"));
                }
                buffer.lock().await.clear();
                elapsed.store(0, Ordering::SeqCst);
                recording.store(true, Ordering::SeqCst);
                info!("Recording started (reusing open input)");
                Ok(())
            }
            State::Captured { .. } => Err(CaptureError::InvalidState("idle or testing")),
        }
    }

    /// `Testing → Idle`: release the device without capturing anything.
    pub async fn stop_testing(&mut self) -> Result<(), CaptureError> {
        if self.phase() != CapturePhase::Testing {
            return Err(CaptureError::InvalidState("testing"));
        }
        let State::Open { mut input, pump, .. } = std::mem::replace(&mut self.state, State::Idle)
        else {
            unreachable!()
        };

        input.stop().await?;
        let _ = pump.await;
        Ok(())
    }

    /// `Recording → Captured`: stop buffering, assemble the fragments into
    /// one contiguous WAV clip, and release the device.
    ///
    /// No chunk is appended after this transition; the frame channel closes
    /// when the device is released.
    pub async fn stop_recording(&mut self) -> Result<&CapturedAudio, CaptureError> {
        if self.phase() != CapturePhase::Recording {
            return Err(CaptureError::InvalidState("recording"));
        }
        let State::Open {
            mut input,
            pump,
            buffer,
            ..
        } = std::mem::replace(&mut self.state, State::Idle)
        else {
            unreachable!()
        };

        // Release the device first; the pump drains remaining frames and
        // exits when the channel closes.
        input.stop().await?;
        let format = pump
            .await
            .map_err(|e| CaptureError::Other(anyhow::anyhow!("capture pump panicked: {}", e)))?;

        let samples = std::mem::take(&mut *buffer.lock().await);
        let (sample_rate, channels) =
            format.unwrap_or((self.config.sample_rate, self.config.channels));

        let duration_seconds = encode::pcm_duration_seconds(samples.len(), sample_rate, channels);
        let bytes = encode::wav_from_pcm(&samples, sample_rate, channels)?;

        info!(
            "Recording stopped: {:.1}s, {} bytes",
            duration_seconds,
            bytes.len()
        );

        self.state = State::Captured {
            audio: CapturedAudio {
                bytes,
                mime_type: "audio/wav".to_string(),
                duration_seconds,
            },
        };

        match &self.state {
            State::Captured { audio } => Ok(audio),
            _ => unreachable!(),
        }
    }

    /// `Captured → Idle`: drop the clip and reset the elapsed counter.
    ///
    /// Also the path back to `Idle` after a successful submission.
    pub fn discard(&mut self) {
        if matches!(self.state, State::Captured { .. }) {
            self.state = State::Idle;
        }
    }

    async fn open_device(&mut self, recording: bool) -> Result<(), CaptureError> {
        let mut input = self.factory.open(&self.config);
        let frames = input.start().await?;

        let buffer = Arc::new(Mutex::new(Vec::new()));
        let elapsed = Arc::new(AtomicU64::new(0));
        let recording_flag = Arc::new(AtomicBool::new(recording));
        let (monitor_tx, monitor_rx) = mpsc::channel(16);

        let pump = tokio::spawn(pump_frames(
            frames,
            Arc::clone(&buffer),
            Arc::clone(&elapsed),
            Arc::clone(&recording_flag),
            monitor_tx,
        ));

        info!(
            "Input open ({})",
            if recording { "recording" } else { "testing" }
        );

        self.state = State::Open {
            input,
            pump,
            buffer,
            elapsed,
            recording: recording_flag,
            monitor_rx: Some(monitor_rx),
        };
        Ok(())
    }
}

/// Drains the device's frame channel for the lifetime of one open handle.
///
/// Frames always go to the monitor (level visualization); they are buffered
/// only while the recording flag is set. Returns the (sample_rate, channels)
/// observed, for WAV assembly.
async fn pump_frames(
    mut frames: mpsc::Receiver<AudioFrame>,
    buffer: Arc<Mutex<Vec<i16>>>,
    elapsed: Arc<AtomicU64>,
    recording: Arc<AtomicBool>,
    monitor_tx: mpsc::Sender<AudioFrame>,
) -> Option<(u32, u16)> {
    let mut format = None;

    while let Some(frame) = frames.recv().await {
        if format.is_none() {
            format = Some((frame.sample_rate, frame.channels));
        }

        // Monitor is lossy on purpose; a slow visualizer must not stall
        // capture.
        let _ = monitor_tx.try_send(frame.clone());

        if recording.load(Ordering::SeqCst) {
            let mut buf = buffer.lock().await;
            buf.extend_from_slice(&frame.samples);

            let samples_per_second =
                (frame.sample_rate as usize) * (frame.channels.max(1) as usize);
            elapsed.store((buf.len() / samples_per_second) as u64, Ordering::SeqCst);
        }
    }

    if format.is_none() {
        warn!("Input closed without delivering any frames");
    }
    format
}
