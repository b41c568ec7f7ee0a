use super::input::{AudioFrame, AudioInput, InputConfig, InputFactory};
use super::CaptureError;
use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Microphone input backed by cpal.
///
/// `cpal::Stream` is not `Send`, so the stream lives on a dedicated capture
/// thread for its whole lifetime; frames are forwarded over a channel and
/// `stop` signals the thread to drop the stream and exit.
pub struct CpalInput {
    config: InputConfig,
    handle: Option<CaptureHandle>,
    device_name: String,
}

struct CaptureHandle {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

impl CpalInput {
    pub fn new(config: InputConfig) -> Self {
        Self {
            config,
            handle: None,
            device_name: String::new(),
        }
    }
}

#[async_trait::async_trait]
impl AudioInput for CpalInput {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError> {
        if self.handle.is_some() {
            return Err(CaptureError::Other(anyhow::anyhow!(
                "input device already open"
            )));
        }

        let (frame_tx, frame_rx) = mpsc::channel(64);
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));

        let config = self.config.clone();
        let thread_stop = Arc::clone(&stop);
        let thread = std::thread::spawn(move || {
            capture_thread(config, frame_tx, thread_stop, ready_tx);
        });

        // The thread reports the device name once the stream is live, or
        // the acquisition error if it is not.
        let started = ready_rx
            .recv()
            .map_err(|_| CaptureError::Other(anyhow::anyhow!("capture thread exited early")))?;

        match started {
            Ok(name) => {
                info!("Microphone open: {}", name);
                self.device_name = name;
                self.handle = Some(CaptureHandle { stop, thread });
                Ok(frame_rx)
            }
            Err(e) => {
                let _ = thread.join();
                Err(e)
            }
        }
    }

    async fn stop(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        handle.stop.store(true, Ordering::SeqCst);
        tokio::task::spawn_blocking(move || {
            if handle.thread.join().is_err() {
                warn!("Capture thread panicked during shutdown");
            }
        })
        .await
        .context("failed to join capture thread")?;

        info!("Microphone released: {}", self.device_name);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    fn name(&self) -> &str {
        "cpal-microphone"
    }
}

impl Drop for CpalInput {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.stop.store(true, Ordering::SeqCst);
            let _ = handle.thread.join();
        }
    }
}

fn capture_thread(
    config: InputConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
    stop: Arc<AtomicBool>,
    ready_tx: std::sync::mpsc::Sender<Result<String, CaptureError>>,
) {
    let stream = match open_stream(&config, frame_tx) {
        Ok((stream, name)) => {
            let _ = ready_tx.send(Ok(name));
            stream
        }
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    while !stop.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(50));
    }

    // Dropping the stream releases the device
    drop(stream);
}

fn open_stream(
    config: &InputConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
) -> Result<(cpal::Stream, String), CaptureError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| CaptureError::DeviceUnavailable("no default input device".to_string()))?;

    let name = device
        .name()
        .unwrap_or_else(|_| "unknown input".to_string());

    let supported = device.default_input_config().map_err(|e| {
        // A config query failure on an existing device is almost always an
        // OS-level capture permission problem.
        CaptureError::PermissionDenied(e.to_string())
    })?;

    let stream_config = cpal::StreamConfig {
        channels: supported.channels(),
        sample_rate: supported.sample_rate(),
        buffer_size: cpal::BufferSize::Default,
    };

    let stream = match supported.sample_format() {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, config, frame_tx),
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, config, frame_tx),
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, config, frame_tx),
        other => {
            return Err(CaptureError::Other(anyhow::anyhow!(
                "unsupported sample format: {:?}",
                other
            )))
        }
    }?;

    stream.play().map_err(|e| {
        CaptureError::DeviceUnavailable(format!("failed to start input stream: {}", e))
    })?;

    Ok((stream, name))
}

fn build_stream<T>(
    device: &cpal::Device,
    stream_config: &cpal::StreamConfig,
    input_config: &InputConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
) -> Result<cpal::Stream, CaptureError>
where
    T: SizedSample,
    i16: FromSample<T>,
{
    let sample_rate = stream_config.sample_rate.0;
    let channels = stream_config.channels;
    let samples_per_frame =
        (sample_rate as u64 * input_config.frame_duration_ms / 1000) as usize * channels as usize;

    let mut pending: Vec<i16> = Vec::with_capacity(samples_per_frame);
    let mut sent_samples: u64 = 0;

    let data_callback = move |data: &[T], _info: &cpal::InputCallbackInfo| {
        for &sample in data {
            pending.push(i16::from_sample(sample));
        }

        while pending.len() >= samples_per_frame {
            let samples: Vec<i16> = pending.drain(..samples_per_frame).collect();
            let timestamp_ms =
                sent_samples * 1000 / (sample_rate as u64 * channels.max(1) as u64);
            sent_samples += samples.len() as u64;

            // try_send: the audio callback must never block. A full channel
            // means the consumer stalled; dropping the frame is preferable.
            if frame_tx
                .try_send(AudioFrame {
                    samples,
                    sample_rate,
                    channels,
                    timestamp_ms,
                })
                .is_err()
            {
                break;
            }
        }
    };

    let err_callback = |e: cpal::StreamError| {
        warn!("Input stream error: {}", e);
    };

    device
        .build_input_stream(stream_config, data_callback, err_callback, None)
        .map_err(|e| match e {
            cpal::BuildStreamError::DeviceNotAvailable => {
                CaptureError::DeviceUnavailable("input device disappeared".to_string())
            }
            other => CaptureError::PermissionDenied(other.to_string()),
        })
}

/// Factory producing real microphone inputs.
pub struct CpalInputFactory;

impl InputFactory for CpalInputFactory {
    fn open(&self, config: &InputConfig) -> Box<dyn AudioInput> {
        Box::new(CpalInput::new(config.clone()))
    }
}
