//! Error types for the analysis engine

use std::fmt;

/// Errors that can occur during audio analysis
///
/// Only fatal conditions are errors. Weak or short input is reported on the
/// result through flags and component statuses instead.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Invalid input buffer (empty, unsupported sample rate or channel count,
    /// stems that disagree with the mix)
    InvalidInput(String),

    /// Invalid configuration (unknown genre or stem key in strict mode,
    /// out-of-range parameters)
    InvalidConfig(String),

    /// Framing parameters out of range
    InvalidFrame(String),

    /// The run was cancelled at a suspension point
    Cancelled,

    /// Processing error inside a component
    ProcessingError(String),
}

impl AnalysisError {
    /// Short machine-readable kind name
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::InvalidInput(_) => "invalid_input",
            AnalysisError::InvalidConfig(_) => "invalid_config",
            AnalysisError::InvalidFrame(_) => "invalid_frame",
            AnalysisError::Cancelled => "cancelled",
            AnalysisError::ProcessingError(_) => "processing_error",
        }
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AnalysisError::InvalidConfig(msg) => write!(f, "Invalid config: {}", msg),
            AnalysisError::InvalidFrame(msg) => write!(f, "Invalid frame: {}", msg),
            AnalysisError::Cancelled => write!(f, "Analysis cancelled"),
            AnalysisError::ProcessingError(msg) => write!(f, "Processing error: {}", msg),
        }
    }
}

impl std::error::Error for AnalysisError {}
