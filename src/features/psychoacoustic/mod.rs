//! Psychoacoustic weighting
//!
//! Projects measured band levels through equal-loudness weights for the
//! chosen monitor level, compares the resulting perceived balance with a
//! genre target and suggests corrective EQ moves.

pub mod genre;
pub mod weights;

pub use genre::{resolve_genre, Genre, TOLERANCES_DB};
pub use weights::{balance, monitor_weights, perceived_levels};

use serde::{Deserialize, Serialize};

use crate::config::PsychoacousticConfig;
use crate::features::mix::Severity;
use crate::features::spectral::bands::{Band, N_BANDS};

/// Suggested correction on one band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandCorrection {
    /// Band to adjust
    pub band: Band,
    /// Perceived balance minus target in dB
    pub deviation_db: f32,
    /// Suggested gain in dB (negative = cut)
    pub gain_db: f32,
    /// Severity of the excess over the band's tolerance
    pub severity: Severity,
    /// Human-readable summary
    pub description: String,
}

/// Perceived balance against a genre target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PsychoacousticReport {
    /// Target genre
    pub genre: Genre,
    /// Monitor level used (0 = quiet, 1 = loud)
    pub monitor_level: f32,
    /// Equal-loudness weights applied
    pub weights_db: [f32; N_BANDS],
    /// Measured + weight
    pub perceived_db: [f32; N_BANDS],
    /// Perceived levels relative to their mean
    pub balance_db: [f32; N_BANDS],
    /// Genre target balance
    pub target_db: [f32; N_BANDS],
    /// Suggested moves, in band order
    pub corrections: Vec<BandCorrection>,
}

fn correction_severity(excess_db: f32) -> Severity {
    if excess_db < 2.0 {
        Severity::Mild
    } else if excess_db < 4.0 {
        Severity::Moderate
    } else {
        Severity::Severe
    }
}

/// Weigh measured band levels and compare them with a genre target
///
/// A band whose deviation exceeds its tolerance gets a move of
/// `clamp(-correction_ratio · deviation, ±max_move_db)`.
pub fn weigh_mix(
    measured_db: &[f32; N_BANDS],
    genre: Genre,
    monitor_level: f32,
    config: &PsychoacousticConfig,
) -> PsychoacousticReport {
    log::debug!(
        "Weighing mix for {} at monitor level {:.2}",
        genre,
        monitor_level
    );

    let weights_db = monitor_weights(monitor_level);
    let perceived_db = perceived_levels(measured_db, monitor_level);
    let balance_db = balance(&perceived_db);
    let target_db = balance(&genre.target_db());

    let corrections: Vec<BandCorrection> = Band::ALL
        .iter()
        .filter_map(|&band| {
            let i = band.index();
            let deviation = balance_db[i] - target_db[i];
            let excess = deviation.abs() - TOLERANCES_DB[i];
            if !deviation.is_finite() || excess <= 0.0 {
                return None;
            }
            let gain_db = (-config.correction_ratio * deviation)
                .clamp(-config.max_move_db, config.max_move_db);
            let severity = correction_severity(excess);
            let relation = if deviation > 0.0 { "heavy" } else { "light" };
            Some(BandCorrection {
                band,
                deviation_db: deviation,
                gain_db,
                severity,
                description: format!(
                    "{} sounds {:.1} dB {} for {} at this monitor level: {} {:.1} dB",
                    band.name(),
                    deviation.abs(),
                    relation,
                    genre,
                    if gain_db < 0.0 { "cut" } else { "boost" },
                    gain_db.abs()
                ),
            })
        })
        .collect();

    log::debug!("{} psychoacoustic corrections", corrections.len());
    PsychoacousticReport {
        genre,
        monitor_level,
        weights_db,
        perceived_db,
        balance_db,
        target_db,
        corrections,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gain(report: &PsychoacousticReport, band: Band) -> f32 {
        report
            .corrections
            .iter()
            .find(|c| c.band == band)
            .map(|c| c.gain_db)
            .unwrap_or(0.0)
    }

    #[test]
    fn test_matching_mix_needs_no_correction() {
        // Measured levels that perceive exactly as the pop target at 0.5
        let target = Genre::Pop.target_db();
        let weights = monitor_weights(0.5);
        let measured: [f32; N_BANDS] = std::array::from_fn(|i| target[i] - weights[i] - 20.0);
        let report = weigh_mix(&measured, Genre::Pop, 0.5, &PsychoacousticConfig::default());
        assert!(report.corrections.is_empty());
    }

    #[test]
    fn test_quieter_monitoring_cuts_less_bass() {
        let measured = [-10.0, -12.0, -18.0, -22.0, -26.0, -30.0, -38.0];
        let config = PsychoacousticConfig::default();
        let quiet = weigh_mix(&measured, Genre::Edm, 0.1, &config);
        let loud = weigh_mix(&measured, Genre::Edm, 0.9, &config);
        for band in [Band::Sub, Band::Bass] {
            assert!(gain(&quiet, band) >= gain(&loud, band));
        }
        assert!(quiet.balance_db[0] < loud.balance_db[0]);
    }

    #[test]
    fn test_moves_are_clamped() {
        let measured = [20.0, -12.0, -18.0, -22.0, -26.0, -30.0, -38.0];
        let report = weigh_mix(&measured, Genre::Pop, 0.5, &PsychoacousticConfig::default());
        let sub = report.corrections.iter().find(|c| c.band == Band::Sub).unwrap();
        assert_eq!(sub.gain_db, -3.0);
        assert_eq!(sub.severity, Severity::Severe);
        for c in &report.corrections {
            assert!(c.gain_db.abs() <= 3.0);
        }
    }
}
