//! Reverberation time estimates
//!
//! Sabine: `RT60 = 0.161·V / A`
//!
//! Eyring: `RT60 = 0.161·V / (−S·ln(1 − ᾱ))`, `ᾱ = A / S`
//!
//! Sabine overestimates RT60 in absorptive rooms; Eyring stays valid as
//! `ᾱ` approaches 1.
//!
//! # Reference
//!
//! Kuttruff, H. (2016). *Room Acoustics* (6th ed.). CRC Press. Chapter 5.

use serde::{Deserialize, Serialize};

/// Sabine constant in s/m
pub const SABINE_CONSTANT: f32 = 0.161;

/// Sabine RT60 in seconds
///
/// Returns `f32::INFINITY` when the total absorption is not positive.
///
/// # Example
///
/// ```
/// use stratum_studio::features::room::reverb::sabine_rt60;
///
/// assert!((sabine_rt60(100.0, 16.1) - 1.0).abs() < 1e-6);
/// assert!(sabine_rt60(100.0, 0.0).is_infinite());
/// ```
pub fn sabine_rt60(volume: f32, absorption: f32) -> f32 {
    if absorption.is_nan() || absorption <= 0.0 {
        return f32::INFINITY;
    }
    SABINE_CONSTANT * volume / absorption
}

/// Eyring RT60 in seconds
///
/// Returns 0.0 when `mean_alpha ≥ 1` (fully absorptive) and
/// `f32::INFINITY` when `mean_alpha ≤ 0`.
pub fn eyring_rt60(volume: f32, surface: f32, mean_alpha: f32) -> f32 {
    if mean_alpha >= 1.0 {
        return 0.0;
    }
    if mean_alpha.is_nan() || mean_alpha <= 0.0 || surface.is_nan() || surface <= 0.0 {
        return f32::INFINITY;
    }
    SABINE_CONSTANT * volume / (-surface * (1.0 - mean_alpha).ln())
}

/// Schroeder frequency `2000·√(RT60 / V)` in Hz
///
/// Returns `f32::INFINITY` for a non-finite RT60 or a non-positive volume.
pub fn schroeder_frequency(rt60: f32, volume: f32) -> f32 {
    if !rt60.is_finite() || volume.is_nan() || volume <= 0.0 {
        return f32::INFINITY;
    }
    2000.0 * (rt60.max(0.0) / volume).sqrt()
}

/// Reverberation in one octave band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BandReverb {
    /// Octave-band centre in Hz
    pub centre_hz: f32,
    /// Total absorption area in m² (sabins)
    pub absorption: f32,
    /// Mean absorption coefficient `A / S`
    pub mean_alpha: f32,
    /// Sabine RT60 in seconds
    pub sabine_s: f32,
    /// Eyring RT60 in seconds
    pub eyring_s: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sabine_decreases_with_absorption() {
        let mut prev = f32::INFINITY;
        for a in [1.0f32, 5.0, 10.0, 40.0] {
            let rt = sabine_rt60(56.0, a);
            assert!(rt < prev);
            prev = rt;
        }
        assert!(sabine_rt60(56.0, -1.0).is_infinite());
    }

    #[test]
    fn test_eyring_boundaries() {
        assert_eq!(eyring_rt60(56.0, 90.4, 1.0), 0.0);
        assert_eq!(eyring_rt60(56.0, 90.4, 1.2), 0.0);
        assert!(eyring_rt60(56.0, 90.4, 0.0).is_infinite());
        let mut prev = f32::INFINITY;
        for a in [0.05f32, 0.2, 0.5, 0.9] {
            let rt = eyring_rt60(56.0, 90.4, a);
            assert!(rt < prev);
            prev = rt;
        }
    }

    #[test]
    fn test_eyring_below_sabine() {
        let (v, s, a) = (56.0, 90.4, 0.2);
        assert!(eyring_rt60(v, s, a) < sabine_rt60(v, s * a));
    }

    #[test]
    fn test_schroeder() {
        assert!((schroeder_frequency(0.5, 50.0) - 200.0).abs() < 1e-3);
        assert!(schroeder_frequency(f32::INFINITY, 50.0).is_infinite());
    }
}
