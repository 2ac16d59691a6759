//! BPM octave normalisation

use super::TempoCorrection;

/// Fold a tempo into `[lower, upper]` by doubling or halving
///
/// Values exactly on either bound are left alone. Non-finite or
/// non-positive input is returned unchanged.
///
/// # Example
///
/// ```
/// use stratum_studio::features::period::{normalise_bpm, TempoCorrection};
///
/// assert_eq!(normalise_bpm(85.0, 90.0, 180.0), (170.0, TempoCorrection::Doubled));
/// assert_eq!(normalise_bpm(180.0, 90.0, 180.0), (180.0, TempoCorrection::None));
/// ```
pub fn normalise_bpm(bpm: f32, lower: f32, upper: f32) -> (f32, TempoCorrection) {
    if !bpm.is_finite() || bpm <= 0.0 || lower <= 0.0 || upper < 2.0 * lower {
        return (bpm, TempoCorrection::None);
    }

    let mut value = bpm;
    let mut correction = TempoCorrection::None;
    while value < lower {
        value *= 2.0;
        correction = TempoCorrection::Doubled;
    }
    while value > upper {
        value *= 0.5;
        correction = TempoCorrection::Halved;
    }
    (value, correction)
}
