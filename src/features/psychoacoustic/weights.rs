//! Equal-loudness band weights
//!
//! Three monitor profiles approximate the Fletcher-Munson contours at about
//! 40, 60 and 80 phon, expressed as dB offsets for the seven analysis bands
//! relative to the mid band. Low and very high bands are heard as quieter
//! than they measure, most of all at low listening levels.

use crate::features::spectral::bands::N_BANDS;

/// ≈ 40 phon
pub const QUIET_WEIGHTS_DB: [f32; N_BANDS] = [-25.0, -14.0, -7.0, 0.0, 2.0, -1.0, -8.0];

/// ≈ 60 phon
pub const NORMAL_WEIGHTS_DB: [f32; N_BANDS] = [-15.0, -8.0, -4.0, 0.0, 2.0, 0.0, -5.0];

/// ≈ 80 phon
pub const LOUD_WEIGHTS_DB: [f32; N_BANDS] = [-8.0, -4.0, -2.0, 0.0, 1.0, 0.0, -3.0];

fn lerp(a: &[f32; N_BANDS], b: &[f32; N_BANDS], t: f32) -> [f32; N_BANDS] {
    std::array::from_fn(|i| a[i] + (b[i] - a[i]) * t)
}

/// Band weights for a monitor level in `[0, 1]`
///
/// `[0, 0.5]` blends quiet → normal with factor `2t`; `[0.5, 1]` blends
/// normal → loud with factor `2(t - 0.5)`. Out-of-range levels are clamped
/// and NaN reads as 0.5.
///
/// # Example
///
/// ```
/// use stratum_studio::features::psychoacoustic::weights::{monitor_weights, NORMAL_WEIGHTS_DB};
///
/// assert_eq!(monitor_weights(0.5), NORMAL_WEIGHTS_DB);
/// assert_eq!(monitor_weights(0.25)[0], -20.0);
/// ```
pub fn monitor_weights(level: f32) -> [f32; N_BANDS] {
    let t = if level.is_nan() {
        0.5
    } else {
        level.clamp(0.0, 1.0)
    };
    if t <= 0.5 {
        lerp(&QUIET_WEIGHTS_DB, &NORMAL_WEIGHTS_DB, 2.0 * t)
    } else {
        lerp(&NORMAL_WEIGHTS_DB, &LOUD_WEIGHTS_DB, 2.0 * (t - 0.5))
    }
}

/// Perceived band levels: measured + weight
pub fn perceived_levels(measured_db: &[f32; N_BANDS], level: f32) -> [f32; N_BANDS] {
    let weights = monitor_weights(level);
    std::array::from_fn(|i| measured_db[i] + weights[i])
}

/// Levels relative to their own mean
pub fn balance(levels: &[f32; N_BANDS]) -> [f32; N_BANDS] {
    let mean = levels.iter().sum::<f32>() / N_BANDS as f32;
    levels.map(|l| l - mean)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_endpoints() {
        assert_eq!(monitor_weights(0.0), QUIET_WEIGHTS_DB);
        assert_eq!(monitor_weights(1.0), LOUD_WEIGHTS_DB);
        assert_eq!(monitor_weights(-3.0), QUIET_WEIGHTS_DB);
        assert_eq!(monitor_weights(f32::NAN), NORMAL_WEIGHTS_DB);
    }

    #[test]
    fn test_interpolation_is_continuous_and_monotone_in_bass() {
        let mut prev = monitor_weights(0.0)[0];
        for step in 1..=20 {
            let sub = monitor_weights(step as f32 / 20.0)[0];
            assert!(sub >= prev);
            prev = sub;
        }
        let below = monitor_weights(0.4999);
        let above = monitor_weights(0.5001);
        for i in 0..N_BANDS {
            assert!((below[i] - above[i]).abs() < 0.01);
        }
    }

    #[test]
    fn test_balance_sums_to_zero() {
        let b = balance(&[-10.0, -12.0, -15.0, -20.0, -22.0, -30.0, -40.0]);
        assert!(b.iter().sum::<f32>().abs() < 1e-4);
    }
}
