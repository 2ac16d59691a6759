//! Onset peak picking
//!
//! An onset is a local maximum of the normalised envelope above the adaptive
//! threshold. Peaks closer than the refractory period are merged, keeping the
//! stronger one.

use super::envelope::{onset_envelope, OnsetEnvelope};
use super::threshold::adaptive_threshold;
use super::Onset;
use crate::analysis::context::{NoSuspend, Suspend};
use crate::config::{AnalysisConfig, RhythmConfig};
use crate::error::AnalysisError;
use crate::features::spectral::stft::StftScratch;
use crate::io::AudioBuffer;
use crate::preprocessing::silence::{trailing_silence_start, SILENCE_AMPLITUDE};

/// Pick onsets from an envelope
///
/// The returned list is strictly ordered by time.
pub fn detect_onsets(
    envelope: &OnsetEnvelope,
    config: &RhythmConfig,
    suspend: &mut dyn Suspend,
) -> Result<Vec<Onset>, AnalysisError> {
    let values = &envelope.values;
    let n = values.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    let frame_rate = envelope.frame_rate();
    let half_window = ((config.threshold_window_s * frame_rate) / 2.0).round().max(1.0) as usize;
    let thresholds = adaptive_threshold(
        values,
        half_window,
        config.threshold_multiplier,
        config.min_onset_strength,
    );

    let mut onsets: Vec<Onset> = Vec::new();
    for i in 0..n {
        suspend.checkpoint()?;
        let v = values[i];
        let rising = i == 0 || v > values[i - 1];
        let not_falling_into_higher = i + 1 >= n || v >= values[i + 1];
        if !(rising && not_falling_into_higher && v > thresholds[i]) {
            continue;
        }

        let onset = Onset {
            time_s: envelope.time_of(i),
            strength: v,
            confidence: (1.0 - (-(v - thresholds[i])).exp()).clamp(0.0, 1.0),
        };

        match onsets.last_mut() {
            Some(last) if onset.time_s - last.time_s < config.refractory_s => {
                if onset.strength > last.strength {
                    *last = onset;
                }
            }
            _ => onsets.push(onset),
        }
    }

    log::debug!(
        "Detected {} onsets over {} frames ({:.2} s)",
        onsets.len(),
        n,
        n as f32 / frame_rate
    );

    Ok(onsets)
}

/// Envelope and onsets for mono samples
///
/// Trailing digital silence is excluded first, so appending silence to a
/// buffer never changes its onset list.
pub fn detect(
    samples: &[f32],
    sample_rate: u32,
    config: &RhythmConfig,
    scratch: &mut StftScratch,
    suspend: &mut dyn Suspend,
) -> Result<(OnsetEnvelope, Vec<Onset>), AnalysisError> {
    let end = trailing_silence_start(samples, SILENCE_AMPLITUDE);
    let envelope = onset_envelope(&samples[..end], sample_rate, config, scratch, suspend)?;
    let onsets = detect_onsets(&envelope, config, suspend)?;
    Ok((envelope, onsets))
}

/// Onset list of a buffer
///
/// # Example
///
/// ```
/// use stratum_studio::features::onset::onset_list;
/// use stratum_studio::{AnalysisConfig, AudioBuffer};
///
/// let buffer = AudioBuffer::mono(vec![0.0f32; 44100], 44100)?;
/// let onsets = onset_list(&buffer, &AnalysisConfig::default())?;
/// assert!(onsets.is_empty());
/// # Ok::<(), stratum_studio::AnalysisError>(())
/// ```
pub fn onset_list(buffer: &AudioBuffer, config: &AnalysisConfig) -> Result<Vec<Onset>, AnalysisError> {
    buffer.validate()?;
    let mono = buffer.mixdown(config.mix_mode);
    let mut scratch = StftScratch::new();
    let (_, onsets) = detect(
        &mono,
        buffer.sample_rate(),
        &config.rhythm,
        &mut scratch,
        &mut NoSuspend,
    )?;
    Ok(onsets)
}
