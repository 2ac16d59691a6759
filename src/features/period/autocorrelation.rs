//! Autocorrelation-based tempo estimation
//!
//! Finds the dominant periodicity of the onset-strength envelope.
//!
//! # Algorithm
//!
//! 1. Biased autocorrelation `r[k] = Σ x[t]·x[t+k] / N` via FFT:
//!    `ACF = IFFT(|FFT(x)|²)` on a zero-padded buffer
//! 2. Restrict lags to the tempo search range (40–240 BPM by default)
//! 3. Weight each lag by a log-gaussian prior centred at 120 BPM
//! 4. Refine the best lag by parabolic interpolation
//!
//! # Reference
//!
//! Ellis, D. P. W. (2007). Beat Tracking by Dynamic Programming.
//! *Journal of New Music Research*, 36(1), 51-60.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use serde::{Deserialize, Serialize};

use crate::config::RhythmConfig;

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Raw tempo estimate before octave normalisation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempoEstimate {
    /// Tempo in BPM
    pub bpm: f32,

    /// Beat period in envelope frames (fractional)
    pub period_frames: f32,

    /// Autocorrelation at the winning lag over the mean absolute
    /// autocorrelation in the search range
    pub peak_to_noise: f32,
}

/// Biased autocorrelation for lags `0..=max_lag`
///
/// Values are divided by the signal length, so longer lags are naturally
/// attenuated.
pub fn biased_autocorrelation(signal: &[f32], max_lag: usize) -> Vec<f32> {
    let n = signal.len();
    if n == 0 {
        return Vec::new();
    }
    let max_lag = max_lag.min(n - 1);
    let size = (2 * n).next_power_of_two();

    let mut planner = FftPlanner::<f32>::new();
    let forward = planner.plan_fft_forward(size);
    let inverse = planner.plan_fft_inverse(size);

    let mut buffer: Vec<Complex<f32>> = signal
        .iter()
        .map(|&x| Complex::new(if x.is_finite() { x } else { 0.0 }, 0.0))
        .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
        .take(size)
        .collect();

    forward.process(&mut buffer);
    for c in buffer.iter_mut() {
        *c = Complex::new(c.norm_sqr(), 0.0);
    }
    inverse.process(&mut buffer);

    // rustfft leaves the inverse unscaled
    let scale = 1.0 / (size as f32 * n as f32);
    buffer[..=max_lag].iter().map(|c| c.re * scale).collect()
}

/// Log-gaussian tempo prior, 1.0 at `centre_bpm`
pub fn tempo_prior(bpm: f32, centre_bpm: f32, sigma_octaves: f32) -> f32 {
    if bpm <= 0.0 || centre_bpm <= 0.0 || sigma_octaves <= 0.0 {
        return 0.0;
    }
    let octaves = (bpm / centre_bpm).log2() / sigma_octaves;
    (-0.5 * octaves * octaves).exp()
}

/// Estimate the dominant tempo of an envelope
///
/// Returns `None` when the envelope is too short to contain two periods of
/// the slowest tempo, or has no positive autocorrelation in range.
pub fn estimate_tempo(
    envelope: &[f32],
    frame_rate: f32,
    config: &RhythmConfig,
) -> Option<TempoEstimate> {
    if envelope.len() < 4 || frame_rate <= 0.0 {
        return None;
    }

    let lag_min = ((60.0 * frame_rate / config.max_bpm).floor() as usize).max(1);
    let lag_max = ((60.0 * frame_rate / config.min_bpm).ceil() as usize).min(envelope.len() - 1);
    if lag_max <= lag_min + 1 {
        log::debug!(
            "Envelope too short for tempo search: {} frames, lags {}..{}",
            envelope.len(),
            lag_min,
            lag_max
        );
        return None;
    }

    let acf = biased_autocorrelation(envelope, lag_max);
    let scores: Vec<f32> = (lag_min..=lag_max)
        .map(|lag| {
            let bpm = 60.0 * frame_rate / lag as f32;
            acf[lag] * tempo_prior(bpm, config.prior_centre_bpm, config.prior_sigma_octaves)
        })
        .collect();

    let (best_idx, &best_score) = scores
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))?;
    if best_score <= 0.0 {
        return None;
    }

    let mut period = (lag_min + best_idx) as f32;
    if best_idx > 0 && best_idx + 1 < scores.len() {
        let (a, b, c) = (scores[best_idx - 1], scores[best_idx], scores[best_idx + 1]);
        let denom = a - 2.0 * b + c;
        if denom.abs() > EPSILON {
            period += (0.5 * (a - c) / denom).clamp(-0.5, 0.5);
        }
    }

    let range = &acf[lag_min..=lag_max];
    let noise = range.iter().map(|r| r.abs()).sum::<f32>() / range.len() as f32;
    let peak_to_noise = acf[lag_min + best_idx] / noise.max(EPSILON);

    let estimate = TempoEstimate {
        bpm: 60.0 * frame_rate / period,
        period_frames: period,
        peak_to_noise,
    };
    log::debug!(
        "Tempo estimate: {:.2} BPM (period {:.2} frames, PNR {:.2})",
        estimate.bpm,
        estimate.period_frames,
        estimate.peak_to_noise
    );
    Some(estimate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pulse_train(n: usize, period: f32) -> Vec<f32> {
        let mut x = vec![-0.1f32; n];
        let mut t = period / 2.0;
        while (t as usize) < n {
            x[t as usize] = 5.0;
            t += period;
        }
        x
    }

    #[test]
    fn test_biased_autocorrelation_matches_direct_sum() {
        let x = [1.0f32, 2.0, -1.0, 0.5, 3.0];
        let r = biased_autocorrelation(&x, 3);
        for (lag, &value) in r.iter().enumerate() {
            let direct: f32 = (0..x.len() - lag).map(|t| x[t] * x[t + lag]).sum::<f32>() / x.len() as f32;
            assert!((value - direct).abs() < 1e-4, "lag {}: {} vs {}", lag, value, direct);
        }
    }

    #[test]
    fn test_prior_peaks_at_centre() {
        assert!((tempo_prior(120.0, 120.0, 0.8) - 1.0).abs() < 1e-6);
        assert!(tempo_prior(60.0, 120.0, 0.8) < tempo_prior(100.0, 120.0, 0.8));
        assert!((tempo_prior(60.0, 120.0, 0.8) - tempo_prior(240.0, 120.0, 0.8)).abs() < 1e-6);
    }

    #[test]
    fn test_estimate_pulse_train_tempo() {
        // 120 BPM at ~86.13 frames/s
        let frame_rate = 44100.0 / 512.0;
        let period = 60.0 * frame_rate / 120.0;
        let env = pulse_train(900, period);
        let estimate = estimate_tempo(&env, frame_rate, &RhythmConfig::default()).unwrap();
        assert!((estimate.bpm - 120.0).abs() < 2.0, "bpm {}", estimate.bpm);
        assert!(estimate.peak_to_noise > 1.2);
    }

    #[test]
    fn test_estimate_slow_pulse_train() {
        let frame_rate = 44100.0 / 512.0;
        let period = 60.0 * frame_rate / 85.0;
        let env = pulse_train(900, period);
        let estimate = estimate_tempo(&env, frame_rate, &RhythmConfig::default()).unwrap();
        assert!((estimate.bpm - 85.0).abs() < 2.0, "bpm {}", estimate.bpm);
    }

    #[test]
    fn test_short_envelope_has_no_tempo() {
        assert!(estimate_tempo(&[1.0; 20], 86.0, &RhythmConfig::default()).is_none());
    }
}
