//! Band-by-band comparison against a reference mix

use serde::{Deserialize, Serialize};

use crate::config::MixConfig;
use crate::features::spectral::bands::{Band, N_BANDS};

/// A suggested EQ move on one band
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EqMove {
    /// Band to adjust
    pub band: Band,
    /// Suggested gain in dB (negative = cut)
    pub gain_db: f32,
    /// Measured minus target level in dB
    pub difference_db: f32,
    /// Human-readable summary
    pub description: String,
}

/// Differences to a reference and the moves they suggest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceComparison {
    /// Measured minus reference level per band in dB
    pub differences_db: [f32; N_BANDS],
    /// Suggested moves, in band order
    pub moves: Vec<EqMove>,
}

/// Compare measured band levels to a reference
///
/// A band louder than the reference by more than
/// `reference_threshold_db` gets a cut of
/// `min(|Δ|·reference_ratio, reference_max_move_db)`; a quieter band gets
/// the same boost. Bands where both levels are below
/// `reference_silence_db` are left alone.
///
/// # Example
///
/// ```
/// use stratum_studio::config::MixConfig;
/// use stratum_studio::features::mix::compare_to_reference;
///
/// let measured = [-20.0, -18.0, -22.0, -25.0, -30.0, -35.0, -80.0];
/// let reference = [-20.0, -24.0, -22.0, -23.5, -30.0, -35.0, -75.0];
/// let cmp = compare_to_reference(&measured, &reference, &MixConfig::default());
/// assert_eq!(cmp.moves.len(), 1);
/// assert_eq!(cmp.moves[0].gain_db, -3.0);
/// ```
pub fn compare_to_reference(
    measured_db: &[f32; N_BANDS],
    reference_db: &[f32; N_BANDS],
    config: &MixConfig,
) -> ReferenceComparison {
    let differences_db: [f32; N_BANDS] = std::array::from_fn(|i| measured_db[i] - reference_db[i]);

    let moves: Vec<EqMove> = Band::ALL
        .iter()
        .zip(differences_db.iter())
        .filter_map(|(&band, &delta)| {
            let i = band.index();
            if measured_db[i] < config.reference_silence_db
                && reference_db[i] < config.reference_silence_db
            {
                return None;
            }
            if delta.abs() <= config.reference_threshold_db || !delta.is_finite() {
                return None;
            }
            let size = (delta.abs() * config.reference_ratio).min(config.reference_max_move_db);
            let gain_db = if delta > 0.0 { -size } else { size };
            let (verb, relation) = if delta > 0.0 {
                ("Cut", "above")
            } else {
                ("Boost", "below")
            };
            Some(EqMove {
                band,
                gain_db,
                difference_db: delta,
                description: format!(
                    "{} {} by {:.1} dB: {:.1} dB {} the reference",
                    verb,
                    band.name(),
                    size,
                    delta.abs(),
                    relation
                ),
            })
        })
        .collect();

    log::debug!("Reference comparison: {} EQ moves", moves.len());
    ReferenceComparison {
        differences_db,
        moves,
    }
}
