//! Grid quantiser
//!
//! Each hit moves from its detected time towards the nearest grid point by
//! `strength`. The grid has `subdivision / 4` steps per beat; with swing,
//! every odd step sits at `swing/100` of its step pair instead of halfway.
//! Quantising always starts from `detected_time_s`, so applying the same
//! settings twice gives the same result.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{DrumHit, DrumKind, HitSource};
use crate::error::AnalysisError;
use crate::features::beat_tracking::BeatGrid;

/// Quantiser settings for one instrument
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantiseSettings {
    /// Swing in [0, 100]; 50 is straight
    pub swing: f32,

    /// Fraction of the distance to the grid point to move (0.0-1.0)
    pub strength: f32,

    /// Grid resolution in notes per bar of 4/4: 4, 8, 16 or 32
    pub subdivision: u32,
}

impl Default for QuantiseSettings {
    fn default() -> Self {
        Self {
            swing: 50.0,
            strength: 1.0,
            subdivision: 16,
        }
    }
}

impl QuantiseSettings {
    /// Check parameter ranges
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if ![4, 8, 16, 32].contains(&self.subdivision) {
            return Err(AnalysisError::InvalidConfig(format!(
                "Quantise subdivision must be 4, 8, 16 or 32, got {}",
                self.subdivision
            )));
        }
        if !(0.0..=100.0).contains(&self.swing) || !(0.0..=1.0).contains(&self.strength) {
            return Err(AnalysisError::InvalidConfig(format!(
                "Quantise swing must be in [0, 100] and strength in [0, 1], got {} / {}",
                self.swing, self.strength
            )));
        }
        Ok(())
    }

    /// Grid points within one beat, as beat fractions in increasing order
    pub fn offsets(&self) -> Vec<f32> {
        let steps = (self.subdivision / 4).max(1) as usize;
        let step = 1.0 / steps as f32;
        (0..steps)
            .map(|i| {
                if i % 2 == 1 {
                    (i - 1) as f32 * step + 2.0 * step * self.swing / 100.0
                } else {
                    i as f32 * step
                }
            })
            .collect()
    }
}

/// Per-instrument quantiser configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuantiseConfig {
    /// Settings for instruments without an override
    pub default: QuantiseSettings,

    /// Per-instrument overrides
    pub per_kind: BTreeMap<DrumKind, QuantiseSettings>,
}

impl QuantiseConfig {
    /// Same settings for every instrument
    pub fn uniform(settings: QuantiseSettings) -> Self {
        Self {
            default: settings,
            per_kind: BTreeMap::new(),
        }
    }

    /// Settings for one instrument
    pub fn settings_for(&self, kind: DrumKind) -> &QuantiseSettings {
        self.per_kind.get(&kind).unwrap_or(&self.default)
    }

    /// Check every entry
    pub fn validate(&self) -> Result<(), AnalysisError> {
        self.default.validate()?;
        self.per_kind.values().try_for_each(|s| s.validate())
    }
}

/// Nearest grid time to `time_s`; ties go to the earlier point
fn nearest_grid_time(grid: &BeatGrid, time_s: f32, offsets: &[f32]) -> Option<f32> {
    let position = grid.beat_position(time_s)?;
    let beat = position.floor() as i64;

    let mut best: Option<(f32, f32)> = None;
    for b in beat - 1..=beat + 1 {
        for &offset in offsets {
            let Some(t) = grid.time_at(b, offset) else {
                continue;
            };
            let distance = (t - time_s).abs();
            if best.is_none_or(|(_, d)| distance < d) {
                best = Some((t, distance));
            }
        }
    }
    best.map(|(t, _)| t)
}

/// Quantise hits towards the grid
///
/// Manual hits are left alone. Detected hits become `Quantised`; predicted
/// hits keep their source. Bar/beat/subbeat are updated from the new time.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidConfig` for out-of-range settings.
pub fn quantise(
    hits: &[DrumHit],
    grid: &BeatGrid,
    config: &QuantiseConfig,
) -> Result<Vec<DrumHit>, AnalysisError> {
    config.validate()?;
    if grid.beats.is_empty() {
        log::warn!("Quantise skipped: beat grid has no beats");
        return Ok(hits.to_vec());
    }

    let mut out = Vec::with_capacity(hits.len());
    for hit in hits {
        let mut hit = hit.clone();
        if hit.source != HitSource::Manual {
            let settings = config.settings_for(hit.kind);
            let offsets = settings.offsets();
            if let Some(target) = nearest_grid_time(grid, hit.detected_time_s, &offsets) {
                hit.time_s = hit.detected_time_s + settings.strength * (target - hit.detected_time_s);
                if hit.source == HitSource::Detected {
                    hit.source = HitSource::Quantised;
                }
            }
        }
        hit.locate_on(grid);
        out.push(hit);
    }

    out.sort_by(|a, b| a.time_s.partial_cmp(&b.time_s).unwrap_or(std::cmp::Ordering::Equal));
    log::debug!("Quantised {} hits", out.len());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::beat_tracking::TimeSignature;
    use crate::features::period::TempoCorrection;

    fn grid() -> BeatGrid {
        let beats: Vec<f32> = (0..16).map(|i| i as f32 * 0.5).collect();
        BeatGrid {
            bpm: 120.0,
            bpm_original: 120.0,
            auto_corrected: TempoCorrection::None,
            confidence: 0.9,
            downbeats: beats.iter().step_by(4).copied().collect(),
            beats,
            time_signature: TimeSignature::FourFour,
            swing: 50.0,
        }
    }

    fn hit(t: f32, kind: DrumKind) -> DrumHit {
        DrumHit {
            time_s: t,
            detected_time_s: t,
            kind,
            original_kind: None,
            velocity: 1.0,
            confidence: 0.9,
            bar: 0,
            beat: 0,
            subbeat: 0,
            source: HitSource::Detected,
        }
    }

    #[test]
    fn test_offsets_with_swing() {
        let straight = QuantiseSettings { swing: 50.0, strength: 1.0, subdivision: 16 };
        assert_eq!(straight.offsets(), vec![0.0, 0.25, 0.5, 0.75]);
        let swung = QuantiseSettings { swing: 75.0, strength: 1.0, subdivision: 8 };
        assert_eq!(swung.offsets(), vec![0.0, 0.75]);
        let quarters = QuantiseSettings { swing: 66.0, strength: 1.0, subdivision: 4 };
        assert_eq!(quarters.offsets(), vec![0.0]);
    }

    #[test]
    fn test_full_strength_snaps() {
        let hits = vec![hit(1.02, DrumKind::Kick), hit(1.37, DrumKind::HiHat)];
        let out = quantise(&hits, &grid(), &QuantiseConfig::default()).unwrap();
        assert!((out[0].time_s - 1.0).abs() < 1e-5);
        assert!((out[1].time_s - 1.375).abs() < 1e-5);
        assert_eq!(out[0].source, HitSource::Quantised);
        assert_eq!((out[0].bar, out[0].beat, out[0].subbeat), (1, 3, 0));
    }

    #[test]
    fn test_half_strength_moves_halfway() {
        let config = QuantiseConfig::uniform(QuantiseSettings { swing: 50.0, strength: 0.5, subdivision: 4 });
        let out = quantise(&[hit(1.1, DrumKind::Snare)], &grid(), &config).unwrap();
        assert!((out[0].time_s - 1.05).abs() < 1e-5);
    }

    #[test]
    fn test_tie_breaks_to_earlier_point() {
        let config = QuantiseConfig::uniform(QuantiseSettings { swing: 50.0, strength: 1.0, subdivision: 4 });
        let out = quantise(&[hit(1.25, DrumKind::Kick)], &grid(), &config).unwrap();
        assert!((out[0].time_s - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_quantise_is_idempotent() {
        let mut config = QuantiseConfig::uniform(QuantiseSettings { swing: 60.0, strength: 0.7, subdivision: 16 });
        config.per_kind.insert(DrumKind::HiHat, QuantiseSettings { swing: 66.0, strength: 0.9, subdivision: 8 });
        let hits: Vec<DrumHit> = [0.52, 0.81, 1.13, 2.29]
            .iter()
            .zip([DrumKind::Kick, DrumKind::HiHat, DrumKind::Snare, DrumKind::HiHat])
            .map(|(&t, k)| hit(t, k))
            .collect();
        let once = quantise(&hits, &grid(), &config).unwrap();
        let twice = quantise(&once, &grid(), &config).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_manual_hits_untouched_and_bad_config_rejected() {
        let mut manual = hit(1.1, DrumKind::Kick);
        manual.source = HitSource::Manual;
        let out = quantise(&[manual.clone()], &grid(), &QuantiseConfig::default()).unwrap();
        assert_eq!(out[0].time_s, 1.1);

        let bad = QuantiseConfig::uniform(QuantiseSettings { swing: 50.0, strength: 1.0, subdivision: 12 });
        assert!(matches!(quantise(&[manual], &grid(), &bad), Err(AnalysisError::InvalidConfig(_))));
    }
}
