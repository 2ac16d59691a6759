//! Spectral kernel
//!
//! Windowed short-time spectra shared by every downstream component:
//! - Frame grids (window/hop bookkeeping)
//! - STFT magnitudes with reusable scratch space
//! - Seven-band averaging for mix analysis
//! - Frequency scale helpers (dB, MIDI, mel)
//!
//! Downstream components request frames and receive linear magnitudes; no
//! windowing decision leaks out of this module.

pub mod bands;
pub mod scale;
pub mod stft;

pub use bands::{to_bands, Band, BandSpectrogram};
pub use stft::{frame, stft, FrameGrid, Spectrogram, StftScratch, WindowType};
