//! Room acoustics
//!
//! Pure function of a room description (dimensions and surface materials):
//! - Per-octave-band Sabine and Eyring RT60
//! - Eigenmodes up to a frequency ceiling, classified axial / tangential /
//!   oblique
//! - First-reflection delays and the Schroeder frequency
//! - Corrective recommendations against a target RT60

pub mod materials;
pub mod modes;
pub mod reverb;

pub use materials::{Material, OCTAVE_BANDS_HZ};
pub use modes::{first_reflections, room_modes, Axis, ModeKind, Reflection, RoomMode};
pub use reverb::{eyring_rt60, sabine_rt60, schroeder_frequency, BandReverb};

use serde::{Deserialize, Serialize};

use crate::config::RoomConfig;
use crate::error::AnalysisError;

/// Interior dimensions in metres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Length (x)
    pub length: f32,
    /// Width (y)
    pub width: f32,
    /// Height (z)
    pub height: f32,
}

/// A rectangular room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    /// Interior dimensions
    pub dimensions: Dimensions,
    /// Floor surface
    pub floor: Material,
    /// Ceiling surface
    pub ceiling: Material,
    /// All four walls
    pub walls: Material,
}

impl Room {
    /// Volume `L·W·H` in m³
    pub fn volume(&self) -> f32 {
        let d = &self.dimensions;
        d.length * d.width * d.height
    }

    /// Total surface `2(LW + LH + WH)` in m²
    pub fn surface_area(&self) -> f32 {
        let d = &self.dimensions;
        2.0 * (d.length * d.width + d.length * d.height + d.width * d.height)
    }

    /// Total absorption in sabins (m²) for each octave band
    pub fn absorption(&self) -> [f32; 6] {
        let d = &self.dimensions;
        let floor_area = d.length * d.width;
        let wall_area = 2.0 * (d.length * d.height + d.width * d.height);
        let floor = self.floor.absorption_coefficients();
        let ceiling = self.ceiling.absorption_coefficients();
        let walls = self.walls.absorption_coefficients();
        std::array::from_fn(|b| floor_area * (floor[b] + ceiling[b]) + wall_area * walls[b])
    }

    /// Check that all dimensions are positive and finite
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let d = &self.dimensions;
        for (name, v) in [("length", d.length), ("width", d.width), ("height", d.height)] {
            if !v.is_finite() || v <= 0.0 {
                return Err(AnalysisError::InvalidInput(format!(
                    "Room {} must be positive, got {}",
                    name, v
                )));
            }
        }
        Ok(())
    }
}

/// Kind of room recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RoomIssue {
    /// Average RT60 well above target
    TooReverberant,
    /// Average RT60 well below target
    TooDead,
    /// Low axial mode likely to cause bass build-up
    AxialMode,
}

/// One corrective suggestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomRecommendation {
    /// What was found
    pub issue: RoomIssue,
    /// Mode frequency for `AxialMode`
    pub frequency_hz: Option<f32>,
    /// Human-readable advice
    pub description: String,
}

/// Acoustic report for a room
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomReport {
    /// Volume in m³
    pub volume: f32,
    /// Total surface area in m²
    pub surface_area: f32,
    /// RT60 per octave band (125 Hz … 4 kHz)
    pub bands: Vec<BandReverb>,
    /// Mean Sabine RT60 over the bands with finite RT60
    pub rt60_avg: f32,
    /// Schroeder frequency in Hz
    pub schroeder_hz: f32,
    /// Eigenmodes up to the configured ceiling
    pub modes: Vec<RoomMode>,
    /// First-reflection delays per axis
    pub reflections: Vec<Reflection>,
    /// Suggested treatment
    pub recommendations: Vec<RoomRecommendation>,
}

impl RoomReport {
    /// Axial modes flagged as problematic
    pub fn problem_modes(&self) -> impl Iterator<Item = &RoomMode> {
        self.recommendations
            .iter()
            .filter(|r| r.issue == RoomIssue::AxialMode)
            .filter_map(|r| {
                let f = r.frequency_hz?;
                self.modes
                    .iter()
                    .find(|m| m.kind == ModeKind::Axial && m.frequency_hz == f)
            })
    }
}

/// Analyse a room
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for non-positive dimensions.
///
/// # Example
///
/// ```
/// use stratum_studio::config::RoomConfig;
/// use stratum_studio::features::room::{analyse_room, Dimensions, Material, Room};
///
/// let room = Room {
///     dimensions: Dimensions { length: 5.0, width: 4.0, height: 2.8 },
///     floor: Material::CarpetThin,
///     ceiling: Material::Plasterboard,
///     walls: Material::Plasterboard,
/// };
/// let report = analyse_room(&room, &RoomConfig::default())?;
/// assert!((report.volume - 56.0).abs() < 1e-4);
/// assert!((0.35..=0.60).contains(&report.bands[3].sabine_s));
/// # Ok::<(), stratum_studio::AnalysisError>(())
/// ```
pub fn analyse_room(room: &Room, config: &RoomConfig) -> Result<RoomReport, AnalysisError> {
    room.validate()?;
    let volume = room.volume();
    let surface_area = room.surface_area();
    log::debug!(
        "Analysing room: {:?}, V={:.2} m³, S={:.2} m²",
        room.dimensions,
        volume,
        surface_area
    );

    let absorption = room.absorption();
    let bands: Vec<BandReverb> = OCTAVE_BANDS_HZ
        .iter()
        .zip(absorption.iter())
        .map(|(&centre_hz, &a)| {
            let mean_alpha = a / surface_area;
            BandReverb {
                centre_hz,
                absorption: a,
                mean_alpha,
                sabine_s: sabine_rt60(volume, a),
                eyring_s: eyring_rt60(volume, surface_area, mean_alpha),
            }
        })
        .collect();

    let finite: Vec<f32> = bands
        .iter()
        .map(|b| b.sabine_s)
        .filter(|v| v.is_finite())
        .collect();
    let rt60_avg = if finite.is_empty() {
        f32::INFINITY
    } else {
        finite.iter().sum::<f32>() / finite.len() as f32
    };
    let schroeder_hz = schroeder_frequency(rt60_avg, volume);

    let modes = room_modes(
        &room.dimensions,
        config.max_mode_order,
        config.max_mode_hz,
        config.speed_of_sound,
    );
    let reflections = first_reflections(&room.dimensions, config.speed_of_sound).to_vec();

    let mut recommendations = Vec::new();
    if rt60_avg > config.too_live_ratio * config.target_rt60 {
        recommendations.push(RoomRecommendation {
            issue: RoomIssue::TooReverberant,
            frequency_hz: None,
            description: format!(
                "Room is too reverberant (RT60 {:.2}s vs target {:.2}s): add absorption",
                rt60_avg, config.target_rt60
            ),
        });
    } else if rt60_avg < config.too_dead_ratio * config.target_rt60 {
        recommendations.push(RoomRecommendation {
            issue: RoomIssue::TooDead,
            frequency_hz: None,
            description: format!(
                "Room is too dead (RT60 {:.2}s vs target {:.2}s): add diffusion",
                rt60_avg, config.target_rt60
            ),
        });
    }
    for mode in modes
        .iter()
        .filter(|m| m.kind == ModeKind::Axial && m.frequency_hz < config.problem_mode_hz)
    {
        recommendations.push(RoomRecommendation {
            issue: RoomIssue::AxialMode,
            frequency_hz: Some(mode.frequency_hz),
            description: format!(
                "Axial mode ({},{},{}) at {:.1} Hz: expect bass build-up, consider bass trapping",
                mode.nx, mode.ny, mode.nz, mode.frequency_hz
            ),
        });
    }

    log::debug!(
        "Room analysed: RT60 avg {:.3}s, Schroeder {:.1} Hz, {} modes, {} recommendations",
        rt60_avg,
        schroeder_hz,
        modes.len(),
        recommendations.len()
    );

    Ok(RoomReport {
        volume,
        surface_area,
        bands,
        rt60_avg,
        schroeder_hz,
        modes,
        reflections,
        recommendations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn studio() -> Room {
        Room {
            dimensions: Dimensions {
                length: 5.0,
                width: 4.0,
                height: 2.8,
            },
            floor: Material::CarpetThin,
            ceiling: Material::Plasterboard,
            walls: Material::Plasterboard,
        }
    }

    #[test]
    fn test_geometry() {
        let room = studio();
        assert!((room.volume() - 56.0).abs() < 1e-4);
        assert!((room.surface_area() - 90.4).abs() < 1e-4);
    }

    #[test]
    fn test_report_values() {
        let report = analyse_room(&studio(), &RoomConfig::default()).unwrap();
        assert_eq!(report.bands.len(), 6);
        // A(1 kHz) = 20·0.69 + 70.4·0.04
        assert!((report.bands[3].absorption - 16.616).abs() < 1e-3);
        assert!((report.bands[3].sabine_s - 0.5426).abs() < 1e-3);
        for b in &report.bands {
            assert!(b.eyring_s < b.sabine_s);
        }
        assert!((report.rt60_avg - 0.5367).abs() < 1e-3);
        assert!((report.schroeder_hz - 195.8).abs() < 0.5);
    }

    #[test]
    fn test_axial_modes_flagged() {
        let report = analyse_room(&studio(), &RoomConfig::default()).unwrap();
        let flagged: Vec<f32> = report.problem_modes().map(|m| m.frequency_hz).collect();
        assert!(flagged.iter().any(|f| (f - 34.3).abs() < 0.5));
        assert!(flagged.iter().any(|f| (f - 42.9).abs() < 0.5));
        assert!(flagged.iter().all(|&f| f < 100.0));
    }

    #[test]
    fn test_too_reverberant_and_too_dead() {
        let live = Room {
            floor: Material::Concrete,
            ceiling: Material::Concrete,
            walls: Material::Brick,
            ..studio()
        };
        let report = analyse_room(&live, &RoomConfig::default()).unwrap();
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.issue == RoomIssue::TooReverberant));

        let dead = Room {
            floor: Material::AcousticFoam,
            ceiling: Material::AcousticFoam,
            walls: Material::AcousticFoam,
            ..studio()
        };
        let report = analyse_room(&dead, &RoomConfig::default()).unwrap();
        assert!(report.recommendations.iter().any(|r| r.issue == RoomIssue::TooDead));
    }

    #[test]
    fn test_zero_absorption_is_infinite() {
        let room = Room {
            floor: Material::Custom([0.0; 6]),
            ceiling: Material::Custom([0.0; 6]),
            walls: Material::Custom([0.0; 6]),
            ..studio()
        };
        let report = analyse_room(&room, &RoomConfig::default()).unwrap();
        assert!(report.bands.iter().all(|b| b.sabine_s.is_infinite()));
        assert!(report.rt60_avg.is_infinite());
        assert!(report.schroeder_hz.is_infinite());
    }

    #[test]
    fn test_invalid_dimensions() {
        let mut room = studio();
        room.dimensions.height = 0.0;
        assert!(analyse_room(&room, &RoomConfig::default()).is_err());
    }
}
