//! Period estimation
//!
//! Converts the onset-strength envelope into a tempo:
//! - Biased autocorrelation with a log-gaussian tempo prior
//! - Octave normalisation into the working BPM range

pub mod autocorrelation;
pub mod normalise;

use serde::{Deserialize, Serialize};

pub use autocorrelation::{estimate_tempo, TempoEstimate};
pub use normalise::normalise_bpm;

/// Octave correction applied to a tempo estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TempoCorrection {
    /// Estimate was already inside the working range
    #[default]
    None,
    /// Estimate was doubled (possibly more than once)
    Doubled,
    /// Estimate was halved (possibly more than once)
    Halved,
}

impl TempoCorrection {
    /// Lowercase name (`"none"`, `"doubled"`, `"halved"`)
    pub fn name(&self) -> &'static str {
        match self {
            TempoCorrection::None => "none",
            TempoCorrection::Doubled => "doubled",
            TempoCorrection::Halved => "halved",
        }
    }
}
