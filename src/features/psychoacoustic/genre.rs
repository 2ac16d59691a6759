//! Genre spectral targets
//!
//! Each target is a perceived band balance (dB relative to the mean of the
//! seven bands, after equal-loudness weighting) typical of the genre's
//! commercial releases.

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::features::spectral::bands::N_BANDS;

/// Allowed deviation from the target per band in dB
pub const TOLERANCES_DB: [f32; N_BANDS] = [3.0, 2.0, 2.0, 1.5, 1.5, 2.0, 3.0];

/// Genre identifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Genre {
    /// `"pop"`
    #[default]
    Pop,
    /// `"edm"`
    Edm,
    /// `"afroHouse"`
    AfroHouse,
    /// `"kpop"`
    Kpop,
}

impl Genre {
    /// All genres
    pub const ALL: [Genre; 4] = [Genre::Pop, Genre::Edm, Genre::AfroHouse, Genre::Kpop];

    /// Wire identifier
    pub fn id(&self) -> &'static str {
        match self {
            Genre::Pop => "pop",
            Genre::Edm => "edm",
            Genre::AfroHouse => "afroHouse",
            Genre::Kpop => "kpop",
        }
    }

    /// Parse a wire identifier
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.id() == id)
    }

    /// Target perceived band levels in dB (sub … air)
    pub fn target_db(&self) -> [f32; N_BANDS] {
        match self {
            Genre::Pop => [8.0, 7.0, 3.0, 0.0, -5.0, -9.0, -14.0],
            Genre::Edm => [11.0, 8.0, 2.0, -1.0, -4.0, -7.0, -12.0],
            Genre::AfroHouse => [9.0, 8.0, 2.0, -1.0, -5.0, -8.0, -13.0],
            Genre::Kpop => [7.0, 6.0, 2.0, 0.0, -3.0, -7.0, -11.0],
        }
    }
}

impl std::fmt::Display for Genre {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Resolve a genre identifier
///
/// Unknown identifiers fall back to pop with a warning, or fail in strict
/// mode.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidConfig` for an unknown identifier when
/// `strict` is set.
pub fn resolve_genre(id: &str, strict: bool) -> Result<Genre, AnalysisError> {
    match Genre::from_id(id) {
        Some(genre) => Ok(genre),
        None if strict => Err(AnalysisError::InvalidConfig(format!(
            "Unknown genre '{}' (expected pop, edm, afroHouse or kpop)",
            id
        ))),
        None => {
            log::warn!("Unknown genre '{}', using pop targets", id);
            Ok(Genre::Pop)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_round_trip() {
        for genre in Genre::ALL {
            assert_eq!(Genre::from_id(genre.id()), Some(genre));
        }
        let json = serde_json::to_string(&Genre::AfroHouse).unwrap();
        assert_eq!(json, "\"afroHouse\"");
    }

    #[test]
    fn test_unknown_genre() {
        assert_eq!(resolve_genre("polka", false).unwrap(), Genre::Pop);
        assert_eq!(resolve_genre("polka", true).unwrap_err().kind(), "invalid_config");
        assert_eq!(resolve_genre("kpop", true).unwrap(), Genre::Kpop);
    }

    #[test]
    fn test_edm_has_most_sub() {
        let edm = Genre::Edm.target_db()[0];
        assert!(Genre::ALL.iter().all(|g| g.target_db()[0] <= edm));
    }
}
