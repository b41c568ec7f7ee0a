use anyhow::{Context, Result};
use std::io::Cursor;

/// Assemble raw PCM samples into an in-memory WAV file.
pub fn wav_from_pcm(samples: &[i16], sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).context("failed to create WAV writer")?;

        for &sample in samples {
            writer
                .write_sample(sample)
                .context("failed to write WAV sample")?;
        }

        writer.finalize().context("failed to finalize WAV")?;
    }

    Ok(cursor.into_inner())
}

/// Duration in seconds of an interleaved PCM buffer.
pub fn pcm_duration_seconds(sample_count: usize, sample_rate: u32, channels: u16) -> f64 {
    if sample_rate == 0 || channels == 0 {
        return 0.0;
    }
    sample_count as f64 / (sample_rate as f64 * channels as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wav_header_carries_spec() {
        let samples = vec![0i16; 1600];
        let bytes = wav_from_pcm(&samples, 16000, 1).unwrap();

        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.sample_rate, 16000);
        assert_eq!(spec.channels, 1);
        assert_eq!(reader.len(), 1600);
    }

    #[test]
    fn duration_accounts_for_channels() {
        assert!((pcm_duration_seconds(44100, 44100, 1) - 1.0).abs() < 1e-9);
        assert!((pcm_duration_seconds(44100, 44100, 2) - 0.5).abs() < 1e-9);
        assert_eq!(pcm_duration_seconds(100, 0, 1), 0.0);
    }
}
