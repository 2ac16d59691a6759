//! Rule-based drum classifier
//!
//! Rules are tried in a fixed order and the first match wins:
//!
//! 1. **kick**: 0–120 Hz is the strongest band and the centroid is low
//! 2. **snare**: 120–300 Hz and 2–6 kHz both strong, moderate flatness
//! 3. **hihat**: high centroid, noisy, short decay
//! 4. **clap**: strong 1–4 kHz, very short decay, broadband noise
//! 5. **tom**: 120–300 Hz is the strongest band and the decay is long
//! 6. **perc**: everything else
//!
//! Every kind gets a fit: the smallest normalised margin by which its
//! conditions hold (negative when one fails). Perc's fit is the distance by
//! which all the other rules miss. Confidence is `0.5 + 0.5·(w − r)`, clamped
//! to [0.5, 1], where `w` is the winner's fit and `r` the best fit among the
//! other kinds, so a hit sitting between two classes reads near 0.5.

use super::features::{extract, DrumFeatures};
use super::{DrumHit, DrumKind, HitSource};
use crate::analysis::context::{NoSuspend, Suspend};
use crate::config::{AnalysisConfig, DrumClassifierConfig};
use crate::error::AnalysisError;
use crate::features::onset::Onset;
use crate::features::spectral::stft::StftScratch;
use crate::io::AudioBuffer;

/// Rule kinds in priority order
const RULES: [DrumKind; 5] = [
    DrumKind::Kick,
    DrumKind::Snare,
    DrumKind::HiHat,
    DrumKind::Clap,
    DrumKind::Tom,
];

/// Margin of `value` above `threshold`, relative to the threshold
fn above(value: f32, threshold: f32) -> f32 {
    (value - threshold) / threshold.abs().max(1e-6)
}

/// Margin of `value` below `threshold`, relative to the threshold
fn below(value: f32, threshold: f32) -> f32 {
    (threshold - value) / threshold.abs().max(1e-6)
}

/// Lead of band `index` over the strongest other band, relative to the
/// strongest band; -1 when there is no energy
fn dominance(bands: &[f32; 5], index: usize) -> f32 {
    let top = bands.iter().copied().fold(0.0f32, f32::max);
    if top <= 0.0 {
        return -1.0;
    }
    let rival = bands
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != index)
        .map(|(_, &b)| b)
        .fold(0.0f32, f32::max);
    (bands[index] - rival) / top
}

/// Fit of one rule kind; non-negative when all of its conditions hold
fn rule_fit(
    kind: DrumKind,
    f: &DrumFeatures,
    bands: &[f32; 5],
    config: &DrumClassifierConfig,
) -> f32 {
    let margins = match kind {
        DrumKind::Kick => [
            dominance(bands, 0),
            below(f.centroid_hz, config.kick_max_centroid_hz),
            f32::INFINITY,
        ],
        DrumKind::Snare => {
            let (flat_lo, flat_hi) = config.snare_flatness;
            [
                above(f.low, config.snare_min_low),
                above(f.high, config.snare_min_high),
                above(f.flatness, flat_lo).min(below(f.flatness, flat_hi)),
            ]
        }
        DrumKind::HiHat => [
            above(f.centroid_hz, config.hihat_min_centroid_hz),
            above(f.flatness, config.hihat_min_flatness),
            below(f.decay_ms, config.hihat_max_decay_ms),
        ],
        DrumKind::Clap => [
            above(f.presence, config.clap_min_presence),
            below(f.decay_ms, config.clap_max_decay_ms),
            above(f.flatness, config.clap_min_flatness),
        ],
        DrumKind::Tom => [
            dominance(bands, 1),
            above(f.decay_ms, config.tom_min_decay_ms),
            f32::INFINITY,
        ],
        DrumKind::Perc => return f32::NEG_INFINITY,
    };
    margins.iter().copied().fold(f32::INFINITY, f32::min)
}

/// Classify one feature vector
pub fn classify_features(f: &DrumFeatures, config: &DrumClassifierConfig) -> (DrumKind, f32) {
    let bands = f.bands();
    let fits = RULES.map(|kind| rule_fit(kind, f, &bands, config));
    let best_rule = fits.iter().copied().fold(f32::NEG_INFINITY, f32::max);

    let (kind, fit, runner_up) = match fits.iter().position(|&fit| fit >= 0.0) {
        Some(i) => {
            let others = fits
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, &fit)| fit)
                .fold(-best_rule, f32::max);
            (RULES[i], fits[i], others)
        }
        None => (DrumKind::Perc, -best_rule, best_rule),
    };

    let confidence = (0.5 + 0.5 * (fit - runner_up).clamp(0.0, 1.0)).clamp(0.5, 1.0);
    (kind, confidence)
}

/// Classify onsets in mono samples
///
/// Velocity is each hit's peak relative to the loudest hit. Grid positions
/// are left at zero; see [`super::assign_positions`].
pub fn classify_samples(
    samples: &[f32],
    sample_rate: u32,
    onsets: &[Onset],
    config: &DrumClassifierConfig,
    scratch: &mut StftScratch,
    suspend: &mut dyn Suspend,
) -> Result<Vec<DrumHit>, AnalysisError> {
    log::debug!("Classifying {} onsets", onsets.len());

    let mut spectrum = Vec::new();
    let mut classified = Vec::with_capacity(onsets.len());
    for onset in onsets {
        suspend.checkpoint()?;
        let features = extract(samples, sample_rate, onset.time_s, config, scratch, &mut spectrum);
        let (kind, confidence) = classify_features(&features, config);
        classified.push((onset.time_s, kind, confidence, features.peak));
    }

    let loudest = classified.iter().map(|c| c.3).fold(0.0f32, f32::max);
    let hits: Vec<DrumHit> = classified
        .into_iter()
        .map(|(time_s, kind, confidence, peak)| DrumHit {
            time_s,
            detected_time_s: time_s,
            kind,
            original_kind: None,
            velocity: if loudest > 0.0 { (peak / loudest).clamp(0.0, 1.0) } else { 0.0 },
            confidence,
            bar: 0,
            beat: 0,
            subbeat: 0,
            source: HitSource::Detected,
        })
        .collect();

    let counts: Vec<(DrumKind, usize)> = DrumKind::ALL
        .iter()
        .map(|&k| (k, hits.iter().filter(|h| h.kind == k).count()))
        .filter(|&(_, n)| n > 0)
        .collect();
    log::debug!("Drum classes: {:?}", counts);

    Ok(hits)
}

/// Classify onsets of a buffer
pub fn classify(
    buffer: &AudioBuffer,
    onsets: &[Onset],
    config: &AnalysisConfig,
) -> Result<Vec<DrumHit>, AnalysisError> {
    buffer.validate()?;
    let mono = buffer.mixdown(config.mix_mode);
    let mut scratch = StftScratch::new();
    classify_samples(
        &mono,
        buffer.sample_rate(),
        onsets,
        &config.drums,
        &mut scratch,
        &mut NoSuspend,
    )
}

#[cfg(test)]
mod tests {
    use super::super::features::synth::{hihat, kick, place};
    use super::*;

    fn features() -> DrumFeatures {
        DrumFeatures {
            sub: 0.0,
            low: 0.0,
            mid: 0.0,
            high: 0.0,
            air: 0.0,
            presence: 0.0,
            centroid_hz: 1000.0,
            flatness: 0.1,
            zcr: 0.1,
            decay_ms: 80.0,
            decay_slope_db_s: -250.0,
            peak: 0.5,
        }
    }

    #[test]
    fn test_rule_order() {
        let config = DrumClassifierConfig::default();

        let kick = DrumFeatures { sub: 0.8, low: 0.15, mid: 0.05, centroid_hz: 90.0, ..features() };
        assert_eq!(classify_features(&kick, &config).0, DrumKind::Kick);

        let snare = DrumFeatures { low: 0.3, mid: 0.3, high: 0.3, air: 0.1, flatness: 0.3, ..features() };
        assert_eq!(classify_features(&snare, &config).0, DrumKind::Snare);

        let hat = DrumFeatures {
            high: 0.3,
            air: 0.7,
            centroid_hz: 9000.0,
            flatness: 0.5,
            decay_ms: 30.0,
            ..features()
        };
        assert_eq!(classify_features(&hat, &config).0, DrumKind::HiHat);

        let clap = DrumFeatures {
            mid: 0.6,
            high: 0.4,
            presence: 0.6,
            centroid_hz: 2500.0,
            flatness: 0.3,
            decay_ms: 40.0,
            ..features()
        };
        assert_eq!(classify_features(&clap, &config).0, DrumKind::Clap);

        let tom = DrumFeatures { low: 0.7, mid: 0.3, centroid_hz: 300.0, decay_ms: 350.0, ..features() };
        assert_eq!(classify_features(&tom, &config).0, DrumKind::Tom);

        let other = DrumFeatures { mid: 1.0, ..features() };
        let (kind, conf) = classify_features(&other, &config);
        assert_eq!(kind, DrumKind::Perc);
        assert!((0.5..=1.0).contains(&conf));
    }

    #[test]
    fn test_kick_tom_boundary_is_ambiguous() {
        let config = DrumClassifierConfig::default();
        // Sub barely ahead of low-mid, long decay: one step from a tom
        let hit = DrumFeatures {
            sub: 0.45,
            low: 0.44,
            mid: 0.11,
            centroid_hz: 200.0,
            decay_ms: 350.0,
            ..features()
        };
        let (kind, conf) = classify_features(&hit, &config);
        assert_eq!(kind, DrumKind::Kick);
        assert!(conf < 0.55, "confidence {}", conf);

        // Same hit with the low-mid clearly on top is a tom
        let tom = DrumFeatures { sub: 0.2, low: 0.69, ..hit };
        assert_eq!(classify_features(&tom, &config).0, DrumKind::Tom);

        // A kick far from every other class is confident
        let clear = DrumFeatures { sub: 0.9, low: 0.05, mid: 0.05, centroid_hz: 80.0, ..features() };
        let (kind, conf) = classify_features(&clear, &config);
        assert_eq!(kind, DrumKind::Kick);
        assert!(conf > 0.8, "confidence {}", conf);
    }

    #[test]
    fn test_perc_confidence_tracks_nearest_rule() {
        let config = DrumClassifierConfig::default();
        // Mid-heavy hit that just misses the clap rule
        let near_clap = DrumFeatures {
            mid: 0.6,
            high: 0.06,
            presence: 0.34,
            centroid_hz: 2500.0,
            flatness: 0.3,
            decay_ms: 40.0,
            ..features()
        };
        let far = DrumFeatures { mid: 1.0, ..features() };
        let (kind, near_conf) = classify_features(&near_clap, &config);
        assert_eq!(kind, DrumKind::Perc);
        let (_, far_conf) = classify_features(&far, &config);
        assert!(near_conf < far_conf);
        assert!(near_conf < 0.6);
    }

    #[test]
    fn test_confidence_in_range() {
        let config = DrumClassifierConfig::default();
        let kick = DrumFeatures { sub: 0.51, low: 0.49, centroid_hz: 249.0, ..features() };
        let (kind, conf) = classify_features(&kick, &config);
        assert_eq!(kind, DrumKind::Kick);
        assert!((0.5..0.55).contains(&conf));
    }

    #[test]
    fn test_thresholds_are_configurable() {
        let mut config = DrumClassifierConfig::default();
        let kick = DrumFeatures { sub: 0.8, low: 0.2, centroid_hz: 240.0, ..features() };
        assert_eq!(classify_features(&kick, &config).0, DrumKind::Kick);
        config.kick_max_centroid_hz = 200.0;
        assert_ne!(classify_features(&kick, &config).0, DrumKind::Kick);
    }

    #[test]
    fn test_classify_synthetic_kit() {
        let sr = 44100;
        let k = kick(sr, 0.9);
        let h = hihat(sr, 0.5);
        let samples = place(sr, 2.0, &[(0.25, &k), (0.75, &h), (1.25, &k)]);
        let onsets: Vec<Onset> = [0.25, 0.75, 1.25]
            .iter()
            .map(|&t| Onset { time_s: t, strength: 3.0, confidence: 0.9 })
            .collect();
        let hits = classify_samples(
            &samples,
            sr,
            &onsets,
            &DrumClassifierConfig::default(),
            &mut StftScratch::new(),
            &mut NoSuspend,
        )
        .unwrap();

        let kinds: Vec<DrumKind> = hits.iter().map(|h| h.kind).collect();
        assert_eq!(kinds, vec![DrumKind::Kick, DrumKind::HiHat, DrumKind::Kick]);
        assert!(hits.iter().all(|h| (0.0..=1.0).contains(&h.velocity)));
        assert!(hits.iter().any(|h| h.velocity == 1.0));
        assert!(hits.iter().all(|h| h.source == HitSource::Detected));
    }
}
