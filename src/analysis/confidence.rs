//! Confidence scoring module
//!
//! Rolls the per-component confidences of an [`AnalysisResult`] into an
//! overall assessment of analysis quality.
//!
//! # Confidence Components
//!
//! 1. **Rhythm**: beat-grid confidence from the tracker
//! 2. **Harmony**: key clarity and chord coverage
//! 3. **Mix**: 1.0 when the mix analyser ran on adequate input, 0.5 when
//!    degraded
//! 4. **Overall**: weighted average of the components that ran
//!    (rhythm 40%, harmony 30%, mix 30%), renormalised over those present
//!
//! # Example
//!
//! ```no_run
//! use stratum_studio::analysis::confidence::compute_confidence;
//! use stratum_studio::{analyse, AnalysisOptions, AudioBuffer};
//!
//! let buffer = AudioBuffer::mono(vec![0.0f32; 44100 * 30], 44100)?;
//! let result = analyse(&buffer, AnalysisOptions::default())?;
//! let confidence = compute_confidence(&result);
//!
//! println!("Overall confidence: {:.2}", confidence.overall_confidence);
//! # Ok::<(), stratum_studio::AnalysisError>(())
//! ```

use serde::{Deserialize, Serialize};

use super::result::{AnalysisFlag, AnalysisResult, ComponentStatus};

const RHYTHM_WEIGHT: f32 = 0.4;
const HARMONY_WEIGHT: f32 = 0.3;
const MIX_WEIGHT: f32 = 0.3;

/// Analysis confidence scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfidence {
    /// Rhythm confidence (0.0-1.0), `None` if rhythm did not run
    pub rhythm_confidence: Option<f32>,

    /// Harmony confidence (0.0-1.0), `None` if harmony did not run
    pub harmony_confidence: Option<f32>,

    /// Mix confidence (0.0-1.0), `None` if the mix analyser did not run
    pub mix_confidence: Option<f32>,

    /// Overall confidence (weighted average of the components present)
    pub overall_confidence: f32,

    /// Flags raised by any component
    pub flags: Vec<AnalysisFlag>,
}

/// Compute confidence scores for an analysis result
pub fn compute_confidence(result: &AnalysisResult) -> AnalysisConfidence {
    let rhythm_confidence = result
        .rhythm
        .as_ref()
        .map(|r| r.beat_grid.confidence.clamp(0.0, 1.0));
    let harmony_confidence = result.harmony.as_ref().map(|h| h.confidence.clamp(0.0, 1.0));
    let mix_confidence = result.mix.as_ref().map(|_| match result.status.mix {
        ComponentStatus::Ok => 1.0,
        ComponentStatus::Degraded(_) => 0.5,
        _ => 0.0,
    });

    let (sum, weight) = [
        (rhythm_confidence, RHYTHM_WEIGHT),
        (harmony_confidence, HARMONY_WEIGHT),
        (mix_confidence, MIX_WEIGHT),
    ]
    .iter()
    .filter_map(|&(c, w)| c.map(|c| (c * w, w)))
    .fold((0.0f32, 0.0f32), |(s, t), (c, w)| (s + c, t + w));
    let overall_confidence = if weight > 0.0 { sum / weight } else { 0.0 };

    let mut flags: Vec<AnalysisFlag> = Vec::new();
    for (_, status) in result.status.iter() {
        for flag in status.flags() {
            if !flags.contains(flag) {
                flags.push(*flag);
            }
        }
    }

    log::debug!(
        "Confidence scores: rhythm={:?}, harmony={:?}, mix={:?}, overall={:.3}",
        rhythm_confidence,
        harmony_confidence,
        mix_confidence,
        overall_confidence
    );

    AnalysisConfidence {
        rhythm_confidence,
        harmony_confidence,
        mix_confidence,
        overall_confidence,
        flags,
    }
}

impl AnalysisConfidence {
    /// Check if overall confidence is high (>= 0.7)
    pub fn is_high_confidence(&self) -> bool {
        self.overall_confidence >= 0.7
    }

    /// Check if overall confidence is low (< 0.5)
    pub fn is_low_confidence(&self) -> bool {
        self.overall_confidence < 0.5
    }

    /// Human-readable confidence level: "High", "Medium" or "Low"
    pub fn confidence_level(&self) -> &'static str {
        if self.is_high_confidence() {
            "High"
        } else if self.is_low_confidence() {
            "Low"
        } else {
            "Medium"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::metadata::AnalysisMetadata;
    use crate::analysis::result::{ComponentStatuses, RhythmResult};
    use crate::features::beat_tracking::BeatGrid;

    fn result(rhythm: Option<f32>, status: ComponentStatuses) -> AnalysisResult {
        AnalysisResult {
            ok: true,
            status,
            rhythm: rhythm.map(|confidence| RhythmResult {
                beat_grid: BeatGrid {
                    confidence,
                    ..BeatGrid::empty(120.0)
                },
                onsets: vec![],
                hits: vec![],
                pattern: None,
                onset_density: 0.0,
            }),
            harmony: None,
            mix: None,
            room: None,
            psychoacoustic: None,
            metadata: AnalysisMetadata::default(),
        }
    }

    #[test]
    fn test_nothing_ran() {
        let confidence = compute_confidence(&result(None, ComponentStatuses::default()));
        assert_eq!(confidence.overall_confidence, 0.0);
        assert_eq!(confidence.confidence_level(), "Low");
        assert!(confidence.rhythm_confidence.is_none());
    }

    #[test]
    fn test_weights_renormalised_over_present_components() {
        let confidence = compute_confidence(&result(Some(0.8), ComponentStatuses::default()));
        assert!((confidence.overall_confidence - 0.8).abs() < 1e-6);
        assert!(confidence.is_high_confidence());
    }

    #[test]
    fn test_flags_collected_once() {
        let status = ComponentStatuses {
            rhythm: ComponentStatus::Degraded(vec![AnalysisFlag::ShortBuffer]),
            harmony: ComponentStatus::Degraded(vec![
                AnalysisFlag::ShortBuffer,
                AnalysisFlag::NoChords,
            ]),
            ..ComponentStatuses::default()
        };
        let confidence = compute_confidence(&result(Some(0.1), status));
        assert_eq!(
            confidence.flags,
            vec![AnalysisFlag::ShortBuffer, AnalysisFlag::NoChords]
        );
    }
}
