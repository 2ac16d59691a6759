//! Feature extraction modules
//!
//! This module contains all analysis components:
//! - Spectral kernel (STFT, band reduction, scales)
//! - Onset detection, period estimation and beat tracking
//! - Drum classification, quantisation and quiet-hit prediction
//! - Chroma extraction, key detection and chord detection
//! - Room acoustics
//! - Mix analysis and psychoacoustic weighting

pub mod beat_tracking;
pub mod chords;
pub mod chroma;
pub mod drums;
pub mod key;
pub mod mix;
pub mod onset;
pub mod period;
pub mod psychoacoustic;
pub mod room;
pub mod spectral;
