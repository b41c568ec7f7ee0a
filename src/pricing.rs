//! Usage and cost accounting for transcription requests.
//!
//! Whisper is billed per started minute of spoken audio; the labeling model
//! is billed per thousand tokens. Rates mirror the upstream list prices.

/// USD per started minute of Whisper transcription
pub const WHISPER_USD_PER_MINUTE: f64 = 0.006;

/// USD per 1000 tokens of the labeling model
pub const LABELING_USD_PER_1K_TOKENS: f64 = 0.03;

/// Billable minutes for a clip: ceil(seconds / 60), minimum 1.
///
/// Whisper occasionally omits the duration field; the original service
/// billed such clips as one minute, and we keep that behavior.
pub fn duration_minutes(spoken_seconds: f64) -> u64 {
    if spoken_seconds <= 0.0 {
        return 1;
    }
    (spoken_seconds / 60.0).ceil() as u64
}

/// Total estimated cost of one request.
///
/// `labeling_tokens` is 0 for plain transcription.
pub fn request_cost_usd(spoken_seconds: f64, labeling_tokens: u64) -> f64 {
    let base = duration_minutes(spoken_seconds) as f64 * WHISPER_USD_PER_MINUTE;
    let labeling = (labeling_tokens as f64 / 1000.0) * LABELING_USD_PER_1K_TOKENS;
    base + labeling
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_duration_up_to_whole_minutes() {
        assert_eq!(duration_minutes(90.0), 2);
        assert_eq!(duration_minutes(60.0), 1);
        assert_eq!(duration_minutes(61.0), 2);
        assert_eq!(duration_minutes(1.0), 1);
    }

    #[test]
    fn unknown_duration_bills_one_minute() {
        assert_eq!(duration_minutes(0.0), 1);
        assert_eq!(duration_minutes(-1.0), 1);
    }

    #[test]
    fn diarized_request_adds_token_cost() {
        // 90s clip -> 2 minutes -> 0.012 base; 4000 tokens -> 0.12 labeling
        let total = request_cost_usd(90.0, 4000);
        assert!((total - 0.132).abs() < 1e-9);
    }

    #[test]
    fn plain_request_is_duration_only() {
        let total = request_cost_usd(90.0, 0);
        assert!((total - 0.012).abs() < 1e-9);
    }
}
