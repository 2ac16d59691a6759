//! Room modes and first reflections
//!
//! Eigenfrequencies of a rectangular room:
//!
//! `f = (c/2)·√((nx/L)² + (ny/W)² + (nz/H)²)`
//!
//! A mode with one non-zero index is axial, two is tangential, three is
//! oblique.

use serde::{Deserialize, Serialize};

use super::Dimensions;

/// Mode classification by number of non-zero indices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeKind {
    /// One non-zero index
    Axial,
    /// Two non-zero indices
    Tangential,
    /// Three non-zero indices
    Oblique,
}

impl ModeKind {
    /// Classify an index triple; `None` for (0, 0, 0)
    pub fn classify(nx: u32, ny: u32, nz: u32) -> Option<Self> {
        match [nx, ny, nz].iter().filter(|&&n| n != 0).count() {
            1 => Some(ModeKind::Axial),
            2 => Some(ModeKind::Tangential),
            3 => Some(ModeKind::Oblique),
            _ => None,
        }
    }
}

/// One room eigenmode
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoomMode {
    /// Length index
    pub nx: u32,
    /// Width index
    pub ny: u32,
    /// Height index
    pub nz: u32,
    /// Eigenfrequency in Hz
    pub frequency_hz: f32,
    /// Axial / tangential / oblique
    pub kind: ModeKind,
}

/// Eigenfrequency of the `(nx, ny, nz)` mode
pub fn mode_frequency(dims: &Dimensions, nx: u32, ny: u32, nz: u32, speed_of_sound: f32) -> f32 {
    let x = nx as f32 / dims.length;
    let y = ny as f32 / dims.width;
    let z = nz as f32 / dims.height;
    0.5 * speed_of_sound * (x * x + y * y + z * z).sqrt()
}

/// All modes with indices up to `max_order` and frequency ≤ `max_hz`
///
/// Sorted by frequency; ties keep index order.
pub fn room_modes(
    dims: &Dimensions,
    max_order: u32,
    max_hz: f32,
    speed_of_sound: f32,
) -> Vec<RoomMode> {
    let mut modes = Vec::new();
    for nx in 0..=max_order {
        for ny in 0..=max_order {
            for nz in 0..=max_order {
                let Some(kind) = ModeKind::classify(nx, ny, nz) else {
                    continue;
                };
                let frequency_hz = mode_frequency(dims, nx, ny, nz, speed_of_sound);
                if frequency_hz.is_finite() && frequency_hz <= max_hz {
                    modes.push(RoomMode {
                        nx,
                        ny,
                        nz,
                        frequency_hz,
                        kind,
                    });
                }
            }
        }
    }
    modes.sort_by(|a, b| {
        a.frequency_hz
            .partial_cmp(&b.frequency_hz)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    modes
}

/// Room axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    /// Between front and back walls
    Length,
    /// Between side walls
    Width,
    /// Between floor and ceiling
    Height,
}

/// First reflection between one pair of opposite surfaces
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reflection {
    /// Surface pair
    pub axis: Axis,
    /// Distance between the surfaces in metres
    pub distance_m: f32,
    /// Round-trip delay `2·d/c` in milliseconds
    pub delay_ms: f32,
}

/// Round-trip delays between each pair of opposite surfaces
pub fn first_reflections(dims: &Dimensions, speed_of_sound: f32) -> [Reflection; 3] {
    let reflect = |axis, d: f32| Reflection {
        axis,
        distance_m: d,
        delay_ms: 2.0 * d / speed_of_sound * 1000.0,
    };
    [
        reflect(Axis::Length, dims.length),
        reflect(Axis::Width, dims.width),
        reflect(Axis::Height, dims.height),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims() -> Dimensions {
        Dimensions {
            length: 5.0,
            width: 4.0,
            height: 2.8,
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(ModeKind::classify(0, 0, 0), None);
        assert_eq!(ModeKind::classify(2, 0, 0), Some(ModeKind::Axial));
        assert_eq!(ModeKind::classify(0, 0, 3), Some(ModeKind::Axial));
        assert_eq!(ModeKind::classify(1, 1, 0), Some(ModeKind::Tangential));
        assert_eq!(ModeKind::classify(1, 2, 3), Some(ModeKind::Oblique));
    }

    #[test]
    fn test_axial_modes() {
        let modes = room_modes(&dims(), 4, 300.0, 343.0);
        assert_eq!(modes[0].kind, ModeKind::Axial);
        assert!((modes[0].frequency_hz - 34.3).abs() < 0.01);
        assert!(modes
            .iter()
            .any(|m| m.ny == 1 && m.nx == 0 && m.nz == 0 && (m.frequency_hz - 42.875).abs() < 0.01));
        for w in modes.windows(2) {
            assert!(w[0].frequency_hz <= w[1].frequency_hz);
        }
        assert!(modes.iter().all(|m| m.frequency_hz <= 300.0));
        assert!(modes.iter().all(|m| m.nx <= 4 && m.ny <= 4 && m.nz <= 4));
    }

    #[test]
    fn test_first_reflections() {
        let r = first_reflections(&dims(), 343.0);
        assert!((r[0].delay_ms - 29.154).abs() < 0.01);
        assert_eq!(r[2].axis, Axis::Height);
    }
}
