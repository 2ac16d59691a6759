//! # Stratum Studio
//!
//! An offline audio analysis engine for music production, built around a
//! single shared spectral kernel.
//!
//! ## Features
//!
//! - **Rhythm**: spectral-flux onsets, autocorrelation tempo with octave
//!   correction, dynamic-programming beat grid, drum hit classification,
//!   quantisation, quiet-hit prediction and pattern matching
//! - **Harmony**: chromagram, Krumhansl-Kessler key detection, template
//!   chord detection with a smoothing state machine, stem fusion and
//!   beat-grid alignment
//! - **Mix**: frequency problems, masking, resonances, K-weighted loudness
//!   and reference comparison
//! - **Room**: Sabine/Eyring RT60, room modes, first reflections
//! - **Psychoacoustic**: monitor-level weighting against genre targets
//!
//! ## Quick Start
//!
//! ```no_run
//! use stratum_studio::{analyse, AnalysisOptions, AudioBuffer};
//!
//! // Decoded PCM, f32 in [-1, 1]
//! let samples: Vec<f32> = vec![0.0; 44100 * 30];
//! let buffer = AudioBuffer::mono(samples, 44100)?;
//!
//! let result = analyse(&buffer, AnalysisOptions::default())?;
//!
//! if let Some(rhythm) = &result.rhythm {
//!     println!("BPM: {:.2} (confidence: {:.2})", rhythm.beat_grid.bpm, rhythm.beat_grid.confidence);
//! }
//! if let Some(harmony) = &result.harmony {
//!     println!("Key: {} ({} chords)", harmony.key, harmony.chords.len());
//! }
//! # Ok::<(), stratum_studio::AnalysisError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! AudioBuffer → mixdown → STFT ─┬→ onsets → beat grid → drums
//!                               ├→ chroma → key → chords
//!                               └→ bands → mix report → psychoacoustic
//! Room description ───────────────→ room report
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod features;
pub mod io;
pub mod preprocessing;

// Re-export main types
pub use analysis::context::CancelToken;
pub use analysis::live::{LiveChordMeter, LiveReading};
pub use analysis::orchestrator::{
    analyse, analyse_batch, band_energies, estimate_work, AnalysisOptions, Reference,
};
pub use analysis::result::{AnalysisResult, BeatGrid, ComponentStatus, Key};
pub use config::AnalysisConfig;
pub use error::AnalysisError;
pub use io::AudioBuffer;
