//! Chroma extraction
//!
//! Pitch-class energy (C..B) per frame of the harmony spectrogram:
//! - Bin folding into 12 pitch classes
//! - Max normalisation per frame
//! - Global chromagram and the per-octave variant

pub mod extractor;
pub mod normalization;

pub use extractor::{
    extract_chroma, frame_chroma, global_chroma, harmony_grid, ChromaMap, Chromagram,
    PerOctaveChroma,
};

/// 12-element pitch-class vector, index 0 = C
pub type Chroma = [f32; 12];

/// Pitch-class names, sharps only
pub const PITCH_CLASS_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Lowest octave kept by the per-octave chromagram
pub const MIN_OCTAVE: u8 = 1;

/// Highest octave kept by the per-octave chromagram
pub const MAX_OCTAVE: u8 = 6;

/// Name of a pitch class (wraps modulo 12)
pub fn pitch_class_name(pc: usize) -> &'static str {
    PITCH_CLASS_NAMES[pc % 12]
}

/// Index of the largest element, `None` for an all-zero vector
pub fn argmax(chroma: &Chroma) -> Option<usize> {
    let (idx, &max) = chroma
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))?;
    if max > 0.0 {
        Some(idx)
    } else {
        None
    }
}
