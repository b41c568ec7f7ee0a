use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Analysis window size in samples; magnitudes come out as WINDOW/2 bins.
pub const WINDOW: usize = 256;

/// Exponential smoothing applied across frames to avoid flicker
const SMOOTHING: f32 = 0.8;

/// Normalized magnitude bands for visual feedback. Thresholds are UI
/// policy, not a correctness contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelBand {
    VeryLow,
    Good,
    High,
    Clipping,
}

impl LevelBand {
    pub fn classify(magnitude: f32) -> Self {
        if magnitude > 0.7 {
            LevelBand::Clipping
        } else if magnitude > 0.4 {
            LevelBand::High
        } else if magnitude > 0.1 {
            LevelBand::Good
        } else {
            LevelBand::VeryLow
        }
    }
}

/// One rendered analysis frame: smoothed per-bin magnitudes plus an
/// aggregate volume level, all normalized to 0..1.
#[derive(Debug, Clone)]
pub struct LevelFrame {
    pub bins: Vec<f32>,
    pub volume: f32,
}

impl LevelFrame {
    pub fn volume_band(&self) -> LevelBand {
        LevelBand::classify(self.volume)
    }
}

/// Real-time frequency-level meter over a live sample feed.
///
/// Purely observational: consumes copies of captured samples and never
/// touches device ownership or the capture state machine. When inactive it
/// produces no frames and its smoothed state is cleared.
pub struct LevelMeter {
    fft: Arc<dyn Fft<f32>>,
    smoothed: Vec<f32>,
    active: bool,
}

impl LevelMeter {
    pub fn new() -> Self {
        let mut planner = FftPlanner::new();
        Self {
            fft: planner.plan_fft_forward(WINDOW),
            smoothed: vec![0.0; WINDOW / 2],
            active: false,
        }
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    /// Clears the meter; no further frames are produced until reactivated.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.smoothed.fill(0.0);
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Analyze the most recent window of samples. Returns `None` while
    /// inactive or when fewer than `WINDOW` samples are available.
    pub fn process(&mut self, samples: &[i16]) -> Option<LevelFrame> {
        if !self.active || samples.len() < WINDOW {
            return None;
        }

        let tail = &samples[samples.len() - WINDOW..];
        let mut buffer: Vec<Complex<f32>> = tail
            .iter()
            .map(|&s| Complex::new(s as f32 / i16::MAX as f32, 0.0))
            .collect();

        self.fft.process(&mut buffer);

        let scale = 2.0 / WINDOW as f32;
        for (smoothed, bin) in self.smoothed.iter_mut().zip(buffer.iter().take(WINDOW / 2)) {
            let magnitude = (bin.norm() * scale).min(1.0);
            *smoothed = SMOOTHING * *smoothed + (1.0 - SMOOTHING) * magnitude;
        }

        let volume = self.smoothed.iter().sum::<f32>() / self.smoothed.len() as f32;

        Some(LevelFrame {
            bins: self.smoothed.clone(),
            volume,
        })
    }
}

impl Default for LevelMeter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(samples: usize, period: usize, amplitude: f32) -> Vec<i16> {
        (0..samples)
            .map(|i| {
                let phase = (i % period) as f32 / period as f32 * std::f32::consts::TAU;
                (phase.sin() * amplitude * i16::MAX as f32) as i16
            })
            .collect()
    }

    #[test]
    fn inactive_meter_produces_nothing() {
        let mut meter = LevelMeter::new();
        assert!(meter.process(&sine(WINDOW, 16, 0.8)).is_none());
    }

    #[test]
    fn silence_reads_as_very_low() {
        let mut meter = LevelMeter::new();
        meter.activate();
        let frame = meter.process(&vec![0i16; WINDOW]).unwrap();
        assert_eq!(frame.volume_band(), LevelBand::VeryLow);
        assert!(frame.volume < 0.01);
    }

    #[test]
    fn short_buffers_are_skipped() {
        let mut meter = LevelMeter::new();
        meter.activate();
        assert!(meter.process(&vec![0i16; WINDOW - 1]).is_none());
    }

    #[test]
    fn smoothing_ramps_toward_the_signal() {
        let mut meter = LevelMeter::new();
        meter.activate();
        let signal = sine(WINDOW, 16, 0.9);

        let first = meter.process(&signal).unwrap().volume;
        let mut last = first;
        for _ in 0..20 {
            last = meter.process(&signal).unwrap().volume;
        }
        assert!(last > first, "repeated frames should raise the level");
    }

    #[test]
    fn deactivate_clears_state() {
        let mut meter = LevelMeter::new();
        meter.activate();
        meter.process(&sine(WINDOW, 16, 0.9)).unwrap();
        meter.deactivate();
        assert!(!meter.is_active());

        meter.activate();
        let frame = meter.process(&vec![0i16; WINDOW]).unwrap();
        assert!(frame.volume < 0.01, "old levels must not leak through");
    }

    #[test]
    fn band_thresholds_partition_the_range() {
        assert_eq!(LevelBand::classify(0.05), LevelBand::VeryLow);
        assert_eq!(LevelBand::classify(0.2), LevelBand::Good);
        assert_eq!(LevelBand::classify(0.5), LevelBand::High);
        assert_eq!(LevelBand::classify(0.9), LevelBand::Clipping);
    }
}
