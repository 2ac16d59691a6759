//! Analysis metadata structures

use serde::{Deserialize, Serialize};

/// Analysis metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// Audio duration in seconds
    pub duration_seconds: f32,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Channel count of the analysed buffer
    pub channels: usize,

    /// Processing time in milliseconds
    pub processing_time_ms: f32,

    /// Algorithm version
    pub algorithm_version: String,

    /// Number of times the run yielded to the host
    pub suspensions: u64,

    /// Confidence warnings (short buffer, weak rhythm, ignored inputs, etc.)
    pub warnings: Vec<String>,
}

impl Default for AnalysisMetadata {
    fn default() -> Self {
        Self {
            duration_seconds: 0.0,
            sample_rate: 0,
            channels: 0,
            processing_time_ms: 0.0,
            algorithm_version: env!("CARGO_PKG_VERSION").to_string(),
            suspensions: 0,
            warnings: vec![],
        }
    }
}
