//! Onset-strength envelope
//!
//! Algorithm:
//! 1. Short-frame STFT (≈23 ms window, half-window hop)
//! 2. Log compression `ln(1 + 1000·|X|)` per bin
//! 3. Half-wave rectified frame-to-frame difference summed over bins
//! 4. Zero mean / unit variance normalisation in a 1 s centered window
//!
//! # Reference
//!
//! Böck, S., & Widmer, G. (2013). Maximum Filter Vibrato Suppression for
//! Onset Detection. *Proceedings of DAFx*.

use crate::analysis::context::Suspend;
use crate::config::RhythmConfig;
use crate::error::AnalysisError;
use crate::features::spectral::scale::nearest_power_of_two;
use crate::features::spectral::stft::{
    stft_samples, FrameGrid, Spectrogram, StftScratch, WindowType, MAX_WINDOW, MIN_WINDOW,
};

/// Log compression factor applied to magnitudes before differencing
pub const LOG_COMPRESSION: f32 = 1000.0;

/// Normalised onset-strength envelope on the rhythm frame grid
#[derive(Debug, Clone)]
pub struct OnsetEnvelope {
    /// Frame grid of the rhythm STFT
    pub grid: FrameGrid,

    /// Raw summed log flux per frame
    pub flux: Vec<f32>,

    /// Locally z-scored flux per frame
    pub values: Vec<f32>,
}

impl OnsetEnvelope {
    /// Number of frames
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True if the envelope has no frames
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Envelope frames per second
    pub fn frame_rate(&self) -> f32 {
        self.grid.frame_rate()
    }

    /// Time of frame `i` in seconds
    pub fn time_of(&self, i: usize) -> f32 {
        self.grid.centre_time(i)
    }

    /// Positive part of the normalised envelope
    pub fn positive(&self) -> Vec<f32> {
        self.values.iter().map(|&v| v.max(0.0)).collect()
    }

    /// Largest envelope value within `radius` frames of `time_s`
    pub fn strength_near(&self, time_s: f32, radius: usize) -> f32 {
        if self.values.is_empty() {
            return 0.0;
        }
        let centre = self.grid.frame_at_time(time_s);
        let lo = centre.saturating_sub(radius);
        let hi = (centre + radius + 1).min(self.values.len());
        self.values[lo..hi]
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max)
    }
}

/// Frame grid used for rhythm analysis at a sample rate
///
/// The window is the power of two nearest `window_seconds · sr` (1024 at
/// 44.1 kHz); the hop is half a window.
pub fn rhythm_grid(
    sample_rate: u32,
    n_samples: usize,
    config: &RhythmConfig,
) -> Result<FrameGrid, AnalysisError> {
    let window = nearest_power_of_two(
        config.window_seconds * sample_rate as f32,
        MIN_WINDOW,
        MAX_WINDOW,
    );
    FrameGrid::new(sample_rate, n_samples, window, window / 2)
}

/// Summed half-wave rectified log-magnitude flux
///
/// Frame 0 has no predecessor and reads 0.
pub fn log_flux(
    spectrogram: &Spectrogram,
    compression: f32,
    suspend: &mut dyn Suspend,
) -> Result<Vec<f32>, AnalysisError> {
    let n_frames = spectrogram.n_frames();
    let n_bins = spectrogram.n_bins();
    let mut flux = vec![0.0f32; n_frames];
    if n_frames == 0 {
        return Ok(flux);
    }

    let mut prev = vec![0.0f32; n_bins];
    let mut cur = vec![0.0f32; n_bins];
    for (p, &m) in prev.iter_mut().zip(spectrogram.frame(0)) {
        *p = (1.0 + compression * m).ln();
    }

    for (i, out) in flux.iter_mut().enumerate().skip(1) {
        suspend.checkpoint()?;
        let mut sum = 0.0f32;
        for ((c, &p), &m) in cur.iter_mut().zip(prev.iter()).zip(spectrogram.frame(i)) {
            *c = (1.0 + compression * m).ln();
            sum += (*c - p).max(0.0);
        }
        *out = if sum.is_finite() { sum } else { 0.0 };
        std::mem::swap(&mut prev, &mut cur);
    }

    Ok(flux)
}

/// Z-score each value against a centered window of `half_window` frames per side
///
/// Uses prefix sums, so cost is linear in the length. Windows with zero
/// variance read 0.
pub fn sliding_zscore(values: &[f32], half_window: usize) -> Vec<f32> {
    let n = values.len();
    let mut sum = vec![0.0f64; n + 1];
    let mut sum_sq = vec![0.0f64; n + 1];
    for (i, &v) in values.iter().enumerate() {
        sum[i + 1] = sum[i] + v as f64;
        sum_sq[i + 1] = sum_sq[i] + (v as f64) * (v as f64);
    }

    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(half_window);
            let hi = (i + half_window + 1).min(n);
            let count = (hi - lo) as f64;
            let mean = (sum[hi] - sum[lo]) / count;
            let var = ((sum_sq[hi] - sum_sq[lo]) / count - mean * mean).max(0.0);
            let std = var.sqrt();
            if std < 1e-9 {
                0.0
            } else {
                ((values[i] as f64 - mean) / std) as f32
            }
        })
        .collect()
}

/// Compute the onset-strength envelope of mono samples
///
/// # Errors
///
/// Returns `AnalysisError::Cancelled` if the run is cancelled, or
/// `InvalidFrame` if the sample rate yields an invalid grid.
pub fn onset_envelope(
    samples: &[f32],
    sample_rate: u32,
    config: &RhythmConfig,
    scratch: &mut StftScratch,
    suspend: &mut dyn Suspend,
) -> Result<OnsetEnvelope, AnalysisError> {
    let grid = rhythm_grid(sample_rate, samples.len(), config)?;
    log::debug!(
        "Computing onset envelope: {} samples at {} Hz, window={}, hop={}",
        samples.len(),
        sample_rate,
        grid.window_size,
        grid.hop_size
    );

    let spectrogram = stft_samples(samples, &grid, WindowType::Hann, scratch, suspend)?;
    let flux = log_flux(&spectrogram, LOG_COMPRESSION, suspend)?;

    let half_window = ((config.normalisation_window_s * grid.frame_rate()) / 2.0).round() as usize;
    let values = sliding_zscore(&flux, half_window.max(1));

    Ok(OnsetEnvelope { grid, flux, values })
}
