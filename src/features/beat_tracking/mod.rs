//! Beat tracking
//!
//! Turns the onset envelope and onset list into a beat grid:
//! - Tempo by autocorrelation, then octave normalisation
//! - Dynamic-programming beat placement
//! - Tempo refinement by beat regression
//! - Downbeat and time-signature inference
//! - Swing estimate
//!
//! Weak input never fails: when onsets are sparse or the periodicity is weak
//! the grid comes back with confidence below 0.3 and no downbeats.

pub mod dynamic;
pub mod grid;
pub mod swing;
pub mod time_signature;

pub use grid::{BeatGrid, GridPosition};
pub use time_signature::TimeSignature;

use crate::analysis::context::Suspend;
use crate::config::RhythmConfig;
use crate::error::AnalysisError;
use crate::features::onset::{Onset, OnsetEnvelope};
use crate::features::period::{estimate_tempo, normalise_bpm};

/// Largest confidence reported for a grid built from weak input
pub const LOW_CONFIDENCE_CAP: f32 = 0.25;

/// Beat grid plus the measurements that qualified it
#[derive(Debug, Clone)]
pub struct TrackedBeats {
    /// The beat grid
    pub grid: BeatGrid,

    /// Onsets per second over the analysed duration
    pub onset_density: f32,

    /// Autocorrelation peak-to-noise ratio (0 if no tempo was found)
    pub peak_to_noise: f32,

    /// Onset density was below the configured floor
    pub sparse_onsets: bool,

    /// Periodicity was below the configured floor
    pub weak_periodicity: bool,
}

/// Build a beat grid from an onset envelope and its onsets
///
/// `duration_s` is the analysed duration used for onset density.
pub fn track_beats(
    envelope: &OnsetEnvelope,
    onsets: &[Onset],
    duration_s: f32,
    config: &RhythmConfig,
    suspend: &mut dyn Suspend,
) -> Result<TrackedBeats, AnalysisError> {
    let onset_density = if duration_s > 0.0 {
        onsets.len() as f32 / duration_s
    } else {
        0.0
    };
    let sparse_onsets = onset_density < config.min_onset_density;
    let frame_rate = envelope.frame_rate();

    let Some(estimate) = estimate_tempo(&envelope.values, frame_rate, config) else {
        log::warn!(
            "No tempo found ({} onsets, {:.2} onsets/s); returning empty grid",
            onsets.len(),
            onset_density
        );
        return Ok(TrackedBeats {
            grid: BeatGrid::empty(config.prior_centre_bpm),
            onset_density,
            peak_to_noise: 0.0,
            sparse_onsets,
            weak_periodicity: true,
        });
    };
    suspend.checkpoint()?;

    let weak_periodicity = estimate.peak_to_noise < config.min_peak_to_noise;
    let (bpm, correction) = normalise_bpm(estimate.bpm, config.bpm_lower, config.bpm_upper);
    if correction != crate::features::period::TempoCorrection::None {
        log::debug!(
            "BPM auto-corrected ({}): {:.2} -> {:.2}",
            correction.name(),
            estimate.bpm,
            bpm
        );
    }

    let period_frames = 60.0 * frame_rate / bpm;
    let positive = envelope.positive();
    let beat_frames = dynamic::place_beats(&positive, period_frames, config.dp_lambda, suspend)?;
    let beats: Vec<f32> = beat_frames.iter().map(|&f| envelope.time_of(f)).collect();

    let refined = match dynamic::regression_bpm(&beats) {
        Some(r) if (r - bpm).abs() <= config.regression_tolerance * bpm => r,
        _ => bpm,
    };
    let final_bpm = refined.clamp(config.bpm_lower, config.bpm_upper);

    let low_signal = sparse_onsets || weak_periodicity;
    let confidence = if low_signal {
        let pnr_part = (estimate.peak_to_noise / config.min_peak_to_noise).clamp(0.0, 1.0);
        let density_part = (onset_density / config.min_onset_density.max(1e-6)).clamp(0.0, 1.0);
        LOW_CONFIDENCE_CAP * pnr_part * density_part
    } else {
        ((estimate.peak_to_noise - config.min_peak_to_noise) / estimate.peak_to_noise)
            .clamp(0.0, 1.0)
    };

    let (downbeats, time_signature) = if low_signal {
        log::warn!(
            "Weak rhythm (density {:.2}/s, PNR {:.2}); omitting downbeats",
            onset_density,
            estimate.peak_to_noise
        );
        (Vec::new(), TimeSignature::FourFour)
    } else {
        let strengths: Vec<f32> = beats.iter().map(|&t| envelope.strength_near(t, 1)).collect();
        let estimate = time_signature::detect_downbeats(&beats, &strengths);
        (estimate.downbeats(&beats), estimate.time_signature)
    };

    let onset_times: Vec<f32> = onsets.iter().map(|o| o.time_s).collect();
    let swing = swing::estimate_swing(&beats, &onset_times);

    log::debug!(
        "Beat grid: {:.2} BPM (original {:.2}), {} beats, {} downbeats, {}, swing {:.1}, confidence {:.2}",
        final_bpm,
        estimate.bpm,
        beats.len(),
        downbeats.len(),
        time_signature.name(),
        swing,
        confidence
    );

    Ok(TrackedBeats {
        grid: BeatGrid {
            bpm: final_bpm,
            bpm_original: estimate.bpm,
            auto_corrected: correction,
            confidence,
            beats,
            downbeats,
            time_signature,
            swing,
        },
        onset_density,
        peak_to_noise: estimate.peak_to_noise,
        sparse_onsets,
        weak_periodicity,
    })
}
