//! Silence measurement utilities

/// Amplitude at or below which a sample counts as digital silence
pub const SILENCE_AMPLITUDE: f32 = 1e-5;

/// Index one past the last non-silent sample
///
/// Everything from the returned index to the end is silence at or below
/// `threshold`. Returns 0 for an entirely silent buffer.
pub fn trailing_silence_start(samples: &[f32], threshold: f32) -> usize {
    samples
        .iter()
        .rposition(|&x| x.abs() > threshold)
        .map(|i| i + 1)
        .unwrap_or(0)
}

/// Linear RMS level of the samples (0.0 for empty input)
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let mean_sq = samples.iter().map(|&x| x * x).sum::<f32>() / samples.len() as f32;
    if mean_sq.is_finite() {
        mean_sq.sqrt()
    } else {
        0.0
    }
}

/// RMS level of the samples in dBFS (`-inf` for empty or silent input)
pub fn rms_db(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return f32::NEG_INFINITY;
    }
    let mean_sq = samples.iter().map(|&x| x * x).sum::<f32>() / samples.len() as f32;
    if mean_sq <= 0.0 {
        return f32::NEG_INFINITY;
    }
    10.0 * mean_sq.log10()
}

/// True if the whole buffer is below `threshold_db` RMS
pub fn is_silent(samples: &[f32], threshold_db: f32) -> bool {
    rms_db(samples) < threshold_db
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trailing_silence_start() {
        let samples = vec![0.0, 0.5, -0.2, 0.0, 0.0];
        assert_eq!(trailing_silence_start(&samples, SILENCE_AMPLITUDE), 3);
        assert_eq!(trailing_silence_start(&[0.0; 8], SILENCE_AMPLITUDE), 0);
        assert_eq!(trailing_silence_start(&[0.3; 4], SILENCE_AMPLITUDE), 4);
    }

    #[test]
    fn test_rms_db_and_silence() {
        assert!((rms_db(&[1.0; 16]) - 0.0).abs() < 1e-6);
        assert!((rms(&[0.5, -0.5]) - 0.5).abs() < 1e-6);
        assert_eq!(rms(&[]), 0.0);
        assert!(is_silent(&[0.0; 1000], -60.0));
        assert!(!is_silent(&[0.1; 1000], -60.0));
    }
}
