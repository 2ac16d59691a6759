//! Quiet-hit predictor
//!
//! Finds each instrument's most common bar pattern (the mode of its per-bar
//! step sets) and rescans the audio where that pattern expects a hit that
//! was not detected. A rescan succeeds when the strongest rise of 5 ms RMS
//! blocks within ±40 ms of the expected time reaches `energy_multiplier`
//! times the median of the same measure at the instrument's existing hits.

use std::collections::BTreeMap;

use super::{DrumHit, DrumKind, HitSource};
use crate::analysis::context::{NoSuspend, Suspend};
use crate::config::{AnalysisConfig, QuietHitConfig};
use crate::error::AnalysisError;
use crate::features::beat_tracking::{BeatGrid, GridPosition};
use crate::features::beat_tracking::grid::STEPS_PER_BEAT;
use crate::features::onset::threshold::median;
use crate::io::AudioBuffer;

/// Strongest block-to-block RMS rise near `time_s`
///
/// Returns `(rise, time of the block where the rise lands)`.
pub fn transient_strength(
    samples: &[f32],
    sample_rate: u32,
    time_s: f32,
    config: &QuietHitConfig,
) -> (f32, f32) {
    let sr = sample_rate as f32;
    let block = ((config.block_ms / 1000.0) * sr).round().max(1.0) as usize;
    let half = config.search_ms / 1000.0;
    let start = (((time_s - half).max(0.0) * sr) as usize).min(samples.len());
    let end = (((time_s + half).max(0.0) * sr) as usize + block).min(samples.len());
    if end <= start + block {
        return (0.0, time_s);
    }

    let rms: Vec<f32> = samples[start..end]
        .chunks_exact(block)
        .map(|c| (c.iter().map(|x| x * x).sum::<f32>() / block as f32).sqrt())
        .collect();

    let mut best = (0.0f32, time_s);
    for (i, pair) in rms.windows(2).enumerate() {
        let rise = pair[1] - pair[0];
        if rise > best.0 {
            best = (rise, (start + (i + 1) * block) as f32 / sr);
        }
    }
    best
}

/// Most frequent non-empty step mask with at least two occurrences
fn mode_mask(masks: &[u64]) -> Option<u64> {
    let mut counts: BTreeMap<u64, (usize, usize)> = BTreeMap::new();
    for (i, &m) in masks.iter().enumerate() {
        let entry = counts.entry(m).or_insert((0, i));
        entry.0 += 1;
    }
    counts
        .into_iter()
        .filter(|&(mask, (count, _))| mask != 0 && count >= 2)
        // Most frequent first, then the one seen earliest
        .max_by(|a, b| a.1 .0.cmp(&b.1 .0).then(b.1 .1.cmp(&a.1 .1)))
        .map(|(mask, _)| mask)
}

/// Recover quiet hits in mono samples
///
/// Returns the input hits plus any predicted hits, sorted by time.
pub fn predict_in_samples(
    samples: &[f32],
    sample_rate: u32,
    hits: &[DrumHit],
    grid: &BeatGrid,
    config: &QuietHitConfig,
    suspend: &mut dyn Suspend,
) -> Result<Vec<DrumHit>, AnalysisError> {
    let mut merged: Vec<DrumHit> = hits.to_vec();
    if grid.beats.is_empty() || hits.is_empty() {
        return Ok(merged);
    }

    let steps_per_bar = (grid.beats_per_bar() * STEPS_PER_BEAT) as usize;
    let located: Vec<(usize, GridPosition)> = hits
        .iter()
        .enumerate()
        .filter_map(|(i, h)| grid.locate(h.time_s).map(|p| (i, p)))
        .collect();
    let (Some(first_bar), Some(last_bar)) = (
        located.iter().map(|(_, p)| p.bar).min(),
        located.iter().map(|(_, p)| p.bar).max(),
    ) else {
        return Ok(merged);
    };
    let n_bars = (last_bar - first_bar + 1) as usize;
    if n_bars < config.min_bars {
        log::debug!("Quiet-hit prediction skipped: {} bar(s)", n_bars);
        return Ok(merged);
    }

    let duration = samples.len() as f32 / sample_rate as f32;
    let min_gap = config.min_separation_ms / 1000.0;
    let mut predicted = 0usize;

    for kind in DrumKind::ALL {
        let mut masks = vec![0u64; n_bars];
        for (i, pos) in &located {
            if hits[*i].kind == kind {
                masks[(pos.bar - first_bar) as usize] |= 1 << pos.step_in_bar();
            }
        }
        let Some(mode) = mode_mask(&masks) else {
            continue;
        };

        let reference: Vec<f32> = hits
            .iter()
            .filter(|h| h.kind == kind)
            .map(|h| transient_strength(samples, sample_rate, h.detected_time_s, config).0)
            .collect();
        let reference_median = median(&reference);
        let threshold = config.energy_multiplier * reference_median;
        if reference_median <= 0.0 {
            continue;
        }

        for (bar_offset, &mask) in masks.iter().enumerate() {
            let missing = mode & !mask;
            if missing == 0 {
                continue;
            }
            for step in 0..steps_per_bar {
                if missing & (1 << step) == 0 {
                    continue;
                }
                suspend.checkpoint()?;
                let position = GridPosition {
                    bar: first_bar + bar_offset as i32,
                    beat: (step / STEPS_PER_BEAT as usize) as u32 + 1,
                    subbeat: (step % STEPS_PER_BEAT as usize) as u32,
                };
                let Some(expected) = grid.time_of(position) else {
                    continue;
                };
                if expected < 0.0 || expected > duration {
                    continue;
                }

                let (strength, time_s) = transient_strength(samples, sample_rate, expected, config);
                if strength <= 0.0 || strength < threshold {
                    continue;
                }
                if merged.iter().any(|h| (h.time_s - time_s).abs() < min_gap) {
                    continue;
                }

                merged.push(DrumHit {
                    time_s,
                    detected_time_s: time_s,
                    kind,
                    original_kind: None,
                    velocity: (strength / reference_median).clamp(0.0, 1.0),
                    confidence: (0.5 * strength / reference_median).clamp(0.0, 1.0),
                    bar: position.bar,
                    beat: position.beat,
                    subbeat: position.subbeat,
                    source: HitSource::Predicted,
                });
                predicted += 1;
            }
        }
    }

    merged.sort_by(|a, b| a.time_s.partial_cmp(&b.time_s).unwrap_or(std::cmp::Ordering::Equal));
    log::debug!("Quiet-hit prediction added {} hit(s)", predicted);
    Ok(merged)
}

/// Recover quiet hits in a buffer
pub fn predict_quiet_hits(
    buffer: &AudioBuffer,
    hits: &[DrumHit],
    grid: &BeatGrid,
    config: &AnalysisConfig,
) -> Result<Vec<DrumHit>, AnalysisError> {
    buffer.validate()?;
    let mono = buffer.mixdown(config.mix_mode);
    predict_in_samples(
        &mono,
        buffer.sample_rate(),
        hits,
        grid,
        &config.quiet_hits,
        &mut NoSuspend,
    )
}

#[cfg(test)]
mod tests {
    use super::super::features::synth::{kick, place};
    use super::*;
    use crate::features::beat_tracking::TimeSignature;
    use crate::features::period::TempoCorrection;

    const SR: u32 = 44100;

    fn grid() -> BeatGrid {
        let beats: Vec<f32> = (0..20).map(|i| 0.25 + i as f32 * 0.5).collect();
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

    fn kick_hit(t: f32) -> DrumHit {
        DrumHit {
            time_s: t,
            detected_time_s: t,
            kind: DrumKind::Kick,
            original_kind: None,
            velocity: 1.0,
            confidence: 0.9,
            bar: 0,
            beat: 0,
            subbeat: 0,
            source: HitSource::Detected,
        }
    }

    /// Four bars of kicks on every beat; the kick at `quiet_at` is played at
    /// `quiet_amp` and left out of the hit list
    fn scene(quiet_at: f32, quiet_amp: f32) -> (Vec<f32>, Vec<DrumHit>) {
        let loud = kick(SR, 0.9);
        let soft = kick(SR, quiet_amp);
        let times: Vec<f32> = (0..16).map(|i| 0.25 + i as f32 * 0.5).collect();
        let sounds: Vec<(f32, &[f32])> = times
            .iter()
            .map(|&t| (t, if t == quiet_at { soft.as_slice() } else { loud.as_slice() }))
            .collect();
        let samples = place(SR, 8.5, &sounds);
        let hits = times.iter().filter(|&&t| t != quiet_at).map(|&t| kick_hit(t)).collect();
        (samples, hits)
    }

    #[test]
    fn test_recovers_quiet_kick() {
        let (samples, hits) = scene(3.25, 0.4);
        let out = predict_in_samples(&samples, SR, &hits, &grid(), &QuietHitConfig::default(), &mut NoSuspend).unwrap();
        assert_eq!(out.len(), hits.len() + 1);
        let new: Vec<&DrumHit> = out.iter().filter(|h| h.source == HitSource::Predicted).collect();
        assert_eq!(new.len(), 1);
        assert!((new[0].time_s - 3.25).abs() < 0.02, "time {}", new[0].time_s);
        assert_eq!(new[0].kind, DrumKind::Kick);
        for pair in out.windows(2) {
            assert!(pair[1].time_s >= pair[0].time_s);
        }
    }

    #[test]
    fn test_silent_gap_is_not_filled() {
        let (samples, hits) = scene(3.25, 0.0);
        let out = predict_in_samples(&samples, SR, &hits, &grid(), &QuietHitConfig::default(), &mut NoSuspend).unwrap();
        assert_eq!(out.len(), hits.len());
    }

    #[test]
    fn test_single_bar_is_not_enough() {
        let (samples, hits) = scene(1.25, 0.4);
        let one_bar: Vec<DrumHit> = hits.into_iter().filter(|h| h.time_s < 2.0).collect();
        let out = predict_in_samples(&samples, SR, &one_bar, &grid(), &QuietHitConfig::default(), &mut NoSuspend).unwrap();
        assert_eq!(out.len(), one_bar.len());
    }

    #[test]
    fn test_mode_mask() {
        assert_eq!(mode_mask(&[0b1011, 0b1011, 0b1001, 0b1011]), Some(0b1011));
        assert_eq!(mode_mask(&[0b1, 0b10, 0b100]), None);
        assert_eq!(mode_mask(&[0, 0, 0]), None);
    }
}
