//! Surface materials and their octave-band absorption coefficients

use serde::{Deserialize, Serialize};

/// Octave-band centre frequencies of the absorption tables
pub const OCTAVE_BANDS_HZ: [f32; 6] = [125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0];

/// Acoustic surface material
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Material {
    /// Poured concrete (very reflective)
    Concrete,
    /// Unglazed brick
    Brick,
    /// Plasterboard on studs
    Plasterboard,
    /// Window glass
    Glass,
    /// Wood panelling
    WoodPanel,
    /// Thin carpet laid on underlay
    CarpetThin,
    /// Carpet glued to concrete
    CarpetOnConcrete,
    /// Heavy curtain, draped
    Curtains,
    /// Suspended acoustic ceiling tile
    AcousticTile,
    /// Acoustic foam panels
    AcousticFoam,
    /// Caller-measured coefficients at 125 Hz … 4 kHz
    Custom([f32; 6]),
}

impl Material {
    /// Absorption coefficients at [125, 250, 500, 1000, 2000, 4000] Hz
    pub fn absorption_coefficients(&self) -> [f32; 6] {
        match self {
            Material::Concrete => [0.01, 0.01, 0.02, 0.02, 0.02, 0.03],
            Material::Brick => [0.03, 0.03, 0.03, 0.04, 0.05, 0.07],
            Material::Plasterboard => [0.29, 0.10, 0.05, 0.04, 0.07, 0.09],
            Material::Glass => [0.35, 0.25, 0.18, 0.12, 0.07, 0.04],
            Material::WoodPanel => [0.42, 0.21, 0.10, 0.08, 0.06, 0.06],
            Material::CarpetThin => [0.08, 0.24, 0.57, 0.69, 0.71, 0.73],
            Material::CarpetOnConcrete => [0.02, 0.06, 0.14, 0.37, 0.60, 0.65],
            Material::Curtains => [0.07, 0.31, 0.49, 0.75, 0.70, 0.60],
            Material::AcousticTile => [0.50, 0.70, 0.60, 0.70, 0.70, 0.50],
            Material::AcousticFoam => [0.35, 0.51, 0.82, 0.98, 0.99, 0.99],
            Material::Custom(coeffs) => {
                let mut c = *coeffs;
                for v in c.iter_mut() {
                    *v = if v.is_finite() { v.clamp(0.0, 1.0) } else { 0.0 };
                }
                c
            }
        }
    }

    /// Mean absorption coefficient over the six bands
    pub fn average_absorption(&self) -> f32 {
        let coeffs = self.absorption_coefficients();
        coeffs.iter().sum::<f32>() / coeffs.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_absorption() {
        assert!(Material::Concrete.average_absorption() < Material::CarpetThin.average_absorption());
        assert!(Material::Brick.average_absorption() < Material::AcousticFoam.average_absorption());
    }

    #[test]
    fn test_custom_clamped() {
        let m = Material::Custom([1.5, -0.2, f32::NAN, 0.5, 0.5, 0.5]);
        assert_eq!(m.absorption_coefficients(), [1.0, 0.0, 0.0, 0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Material::CarpetThin).unwrap();
        assert_eq!(json, "\"carpetThin\"");
    }
}
