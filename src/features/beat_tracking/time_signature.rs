//! Time signature and downbeat inference
//!
//! For every bar length in {4, 3, 6} and every phase within the bar, compare
//! the mean onset strength on the candidate downbeats with the mean on all
//! other beats. The (bar length, phase) with the largest contrast wins.
//! Candidates are tried in the order 4, 3, 6. A different bar length only
//! replaces the current best when its contrast is larger by at least
//! [`MIN_CONTRAST_GAIN`] of the mean beat strength, so ties and near-ties
//! (unaccented clicks) resolve to 4/4.
//!
//! # Example
//!
//! ```
//! use stratum_studio::features::beat_tracking::time_signature::{detect_downbeats, TimeSignature};
//!
//! let beats: Vec<f32> = (0..16).map(|i| i as f32 * 0.5).collect();
//! let strengths: Vec<f32> = (0..16).map(|i| if i % 4 == 1 { 3.0 } else { 1.0 }).collect();
//! let result = detect_downbeats(&beats, &strengths);
//! assert_eq!(result.time_signature, TimeSignature::FourFour);
//! assert_eq!(result.phase, 1);
//! ```

use serde::{Deserialize, Serialize};

/// Contrast lead, as a fraction of the mean beat strength, another bar
/// length needs over the current best
pub const MIN_CONTRAST_GAIN: f32 = 0.1;

/// Musical time signature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeSignature {
    /// 4/4 time (common time)
    #[default]
    FourFour,
    /// 3/4 time (waltz time)
    ThreeFour,
    /// 6/8 time (compound duple)
    SixEight,
}

impl TimeSignature {
    /// Candidates in evaluation order
    pub const CANDIDATES: [TimeSignature; 3] = [
        TimeSignature::FourFour,
        TimeSignature::ThreeFour,
        TimeSignature::SixEight,
    ];

    /// Get beats per bar for this time signature
    pub fn beats_per_bar(&self) -> u32 {
        match self {
            TimeSignature::FourFour => 4,
            TimeSignature::ThreeFour => 3,
            TimeSignature::SixEight => 6,
        }
    }

    /// Get name as string (e.g., "4/4", "3/4", "6/8")
    pub fn name(&self) -> &'static str {
        match self {
            TimeSignature::FourFour => "4/4",
            TimeSignature::ThreeFour => "3/4",
            TimeSignature::SixEight => "6/8",
        }
    }

    /// Time signature with the given bar length
    pub fn from_beats_per_bar(beats: u32) -> Option<Self> {
        match beats {
            4 => Some(TimeSignature::FourFour),
            3 => Some(TimeSignature::ThreeFour),
            6 => Some(TimeSignature::SixEight),
            _ => None,
        }
    }
}

/// Winning bar hypothesis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DownbeatEstimate {
    /// Bar length
    pub time_signature: TimeSignature,

    /// Index of the first downbeat in the beat list
    pub phase: usize,

    /// Mean downbeat strength minus mean strength of the other beats
    pub contrast: f32,
}

impl DownbeatEstimate {
    /// Downbeat times selected from `beats`
    pub fn downbeats(&self, beats: &[f32]) -> Vec<f32> {
        let m = self.time_signature.beats_per_bar() as usize;
        beats.iter().skip(self.phase).step_by(m).copied().collect()
    }
}

/// Pick bar length and downbeat phase from per-beat onset strengths
///
/// `strengths[i]` is the onset strength at `beats[i]`. Hypotheses that do not
/// fit two full bars are skipped; with fewer than 8 beats the result is 4/4
/// at phase 0 with zero contrast.
pub fn detect_downbeats(beats: &[f32], strengths: &[f32]) -> DownbeatEstimate {
    let n = beats.len().min(strengths.len());
    let mut best = DownbeatEstimate {
        time_signature: TimeSignature::FourFour,
        phase: 0,
        contrast: 0.0,
    };
    if n < 8 {
        return best;
    }

    let strengths = &strengths[..n];
    let mean_strength = strengths.iter().map(|s| s.abs()).sum::<f32>() / n as f32;
    let required_gain = MIN_CONTRAST_GAIN * mean_strength;

    let mut best_contrast = f32::NEG_INFINITY;
    for signature in TimeSignature::CANDIDATES {
        let m = signature.beats_per_bar() as usize;
        if n < 2 * m {
            continue;
        }
        let gain = if best_contrast.is_finite() {
            required_gain
        } else {
            0.0
        };
        let mut candidate: Option<DownbeatEstimate> = None;
        for phase in 0..m {
            let contrast = score_phase(strengths, m, phase);
            if candidate.is_none_or(|c| contrast > c.contrast) {
                candidate = Some(DownbeatEstimate {
                    time_signature: signature,
                    phase,
                    contrast,
                });
            }
        }
        if let Some(c) = candidate {
            if c.contrast.is_finite() && c.contrast > best_contrast + gain {
                best_contrast = c.contrast;
                best = c;
            }
        }
    }

    log::debug!(
        "Downbeats: {} phase {} (contrast {:.3})",
        best.time_signature.name(),
        best.phase,
        best.contrast
    );
    best
}

fn score_phase(strengths: &[f32], m: usize, phase: usize) -> f32 {
    let (mut on_sum, mut on_n, mut off_sum, mut off_n) = (0.0f32, 0usize, 0.0f32, 0usize);
    for (i, &s) in strengths.iter().enumerate() {
        if i % m == phase % m {
            on_sum += s;
            on_n += 1;
        } else {
            off_sum += s;
            off_n += 1;
        }
    }
    if on_n == 0 || off_n == 0 {
        return f32::NEG_INFINITY;
    }
    on_sum / on_n as f32 - off_sum / off_n as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beats(n: usize) -> Vec<f32> {
        (0..n).map(|i| i as f32 * 0.5).collect()
    }

    #[test]
    fn test_four_four_accent() {
        let strengths: Vec<f32> = (0..16).map(|i| if i % 4 == 0 { 4.0 } else { 1.0 }).collect();
        let result = detect_downbeats(&beats(16), &strengths);
        assert_eq!(result.time_signature, TimeSignature::FourFour);
        assert_eq!(result.phase, 0);
        assert_eq!(result.downbeats(&beats(16)), vec![0.0, 2.0, 4.0, 6.0]);
    }

    #[test]
    fn test_three_four_accent() {
        let strengths: Vec<f32> = (0..18).map(|i| if i % 3 == 2 { 4.0 } else { 1.0 }).collect();
        let result = detect_downbeats(&beats(18), &strengths);
        assert_eq!(result.time_signature, TimeSignature::ThreeFour);
        assert_eq!(result.phase, 2);
    }

    #[test]
    fn test_flat_strengths_prefer_four_four() {
        let strengths = vec![1.0f32; 24];
        let result = detect_downbeats(&beats(24), &strengths);
        assert_eq!(result.time_signature, TimeSignature::FourFour);
        assert_eq!(result.phase, 0);
    }

    #[test]
    fn test_near_flat_strengths_keep_four_four() {
        // Uniform clicks with a faint 3-beat ripple
        let strengths: Vec<f32> = (0..24)
            .map(|i| if i % 3 == 1 { 2.04 } else { 2.0 })
            .collect();
        let result = detect_downbeats(&beats(24), &strengths);
        assert_eq!(result.time_signature, TimeSignature::FourFour);
    }

    #[test]
    fn test_clear_accent_still_wins() {
        let strengths: Vec<f32> = (0..24)
            .map(|i| if i % 3 == 0 { 2.6 } else { 2.0 })
            .collect();
        let result = detect_downbeats(&beats(24), &strengths);
        assert_eq!(result.time_signature, TimeSignature::ThreeFour);
        assert_eq!(result.phase, 0);
    }

    #[test]
    fn test_insufficient_beats() {
        let result = detect_downbeats(&beats(4), &[1.0; 4]);
        assert_eq!(result.time_signature, TimeSignature::FourFour);
        assert_eq!(result.contrast, 0.0);
    }

    #[test]
    fn test_time_signature_names() {
        assert_eq!(TimeSignature::FourFour.name(), "4/4");
        assert_eq!(TimeSignature::SixEight.beats_per_bar(), 6);
        assert_eq!(TimeSignature::from_beats_per_bar(3), Some(TimeSignature::ThreeFour));
        assert_eq!(TimeSignature::from_beats_per_bar(5), None);
    }
}
