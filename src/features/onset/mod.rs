//! Onset detection
//!
//! - Onset-strength envelope (log-magnitude spectral flux, z-scored)
//! - Adaptive median threshold
//! - Peak picking with a refractory period

pub mod detector;
pub mod envelope;
pub mod threshold;

use serde::{Deserialize, Serialize};

pub use detector::{detect_onsets, onset_list};
pub use envelope::{onset_envelope, OnsetEnvelope};

/// A detected onset
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Onset {
    /// Onset time in seconds (centre of the detecting frame)
    pub time_s: f32,

    /// Envelope value at the peak, in local standard deviations
    pub strength: f32,

    /// Confidence score (0.0-1.0)
    pub confidence: f32,
}
