//! Multi-instrument chroma fusion
//!
//! When separated stems are supplied, chords are detected on a weighted sum
//! of the stem chromagrams:
//!
//! `fused = Σ wᵢ · chromaᵢ · loudnessᵢ`
//!
//! where loudness is each stem's RMS relative to the loudest stem. The bass
//! stem contributes only to its dominant pitch class per frame; drums are
//! never fused. The bass stem also supplies each chord's bass note.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::ChordSegment;
use crate::config::FusionWeights;
use crate::error::AnalysisError;
use crate::features::chroma::normalization::normalise_max;
use crate::features::chroma::{argmax, Chroma, Chromagram};
use crate::io::AudioBuffer;
use crate::preprocessing::silence::rms;

/// Stem role, keyed by the fixed stem-map names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StemKind {
    /// `"vocals"`
    Vocals,
    /// `"bass"`
    Bass,
    /// `"drums"`
    Drums,
    /// `"other"` (keys, guitars, pads)
    Other,
}

impl StemKind {
    /// All stem kinds
    pub const ALL: [StemKind; 4] = [
        StemKind::Vocals,
        StemKind::Bass,
        StemKind::Drums,
        StemKind::Other,
    ];

    /// Stem-map key
    pub fn key(&self) -> &'static str {
        match self {
            StemKind::Vocals => "vocals",
            StemKind::Bass => "bass",
            StemKind::Drums => "drums",
            StemKind::Other => "other",
        }
    }

    /// Parse a stem-map key
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.key() == key)
    }

    /// True for stems that take part in chord fusion
    pub fn is_harmonic(&self) -> bool {
        !matches!(self, StemKind::Drums)
    }

    fn weight(&self, weights: &FusionWeights) -> f32 {
        match self {
            StemKind::Vocals => weights.vocals,
            StemKind::Bass => weights.bass,
            StemKind::Other => weights.other,
            StemKind::Drums => 0.0,
        }
    }
}

/// Validate a stem map against the mix
///
/// Returns the recognised stems ordered by kind. Unknown keys are skipped
/// with a warning, or rejected when `strict` is set.
///
/// # Errors
///
/// - `AnalysisError::InvalidConfig` for an unknown key in strict mode
/// - `AnalysisError::InvalidInput` if a stem's sample rate differs from the mix
pub fn resolve_stems<'a>(
    stems: &'a HashMap<String, AudioBuffer>,
    sample_rate: u32,
    strict: bool,
) -> Result<Vec<(StemKind, &'a AudioBuffer)>, AnalysisError> {
    let mut resolved = Vec::with_capacity(stems.len());
    for (key, buffer) in stems {
        let Some(kind) = StemKind::from_key(key) else {
            if strict {
                return Err(AnalysisError::InvalidConfig(format!(
                    "Unknown stem key '{}' (expected vocals, bass, drums or other)",
                    key
                )));
            }
            log::warn!("Ignoring unknown stem key '{}'", key);
            continue;
        };
        if buffer.sample_rate() != sample_rate {
            return Err(AnalysisError::InvalidInput(format!(
                "Stem '{}' has sample rate {} Hz, mix has {} Hz",
                key,
                buffer.sample_rate(),
                sample_rate
            )));
        }
        buffer.validate()?;
        resolved.push((kind, buffer));
    }
    resolved.sort_by_key(|(kind, _)| *kind);
    Ok(resolved)
}

/// Chromagram and level of one stem
#[derive(Debug, Clone)]
pub struct StemChroma {
    /// Stem role
    pub kind: StemKind,
    /// Chromagram on the shared harmony grid
    pub chromagram: Chromagram,
    /// Linear RMS of the stem's mono mixdown
    pub rms: f32,
}

impl StemChroma {
    /// Bundle a stem chromagram with the RMS of its samples
    pub fn new(kind: StemKind, chromagram: Chromagram, samples: &[f32]) -> Self {
        Self {
            kind,
            chromagram,
            rms: rms(samples),
        }
    }
}

/// Fuse stem chromagrams frame by frame
///
/// Returns an empty vector when no harmonic stem carries signal. Each fused
/// frame is normalised to max = 1.
pub fn fuse_chroma(stems: &[StemChroma], weights: &FusionWeights) -> Vec<Chroma> {
    let harmonic: Vec<&StemChroma> = stems.iter().filter(|s| s.kind.is_harmonic()).collect();
    let loudest = harmonic.iter().map(|s| s.rms).fold(0.0f32, f32::max);
    if harmonic.is_empty() || loudest <= 0.0 {
        return Vec::new();
    }

    let n_frames = harmonic
        .iter()
        .map(|s| s.chromagram.n_frames())
        .max()
        .unwrap_or(0);

    log::debug!(
        "Fusing {} harmonic stems over {} frames",
        harmonic.len(),
        n_frames
    );

    let mut fused = vec![[0.0f32; 12]; n_frames];
    for stem in &harmonic {
        let gain = stem.kind.weight(weights) * stem.rms / loudest;
        for (out, chroma) in fused.iter_mut().zip(stem.chromagram.frames.iter()) {
            if stem.kind == StemKind::Bass {
                if let Some(pc) = argmax(chroma) {
                    out[pc] += gain * chroma[pc];
                }
            } else {
                for (o, &c) in out.iter_mut().zip(chroma.iter()) {
                    *o += gain * c;
                }
            }
        }
    }
    for frame in fused.iter_mut() {
        normalise_max(frame);
    }
    fused
}

/// Set each segment's bass note from the bass stem chromagram
///
/// The bass note is the strongest pitch class of the bass chroma summed over
/// the frames whose centre lies inside the segment.
pub fn attach_bass_notes(segments: &mut [ChordSegment], bass: &Chromagram) {
    for segment in segments.iter_mut() {
        let mut sum = [0.0f32; 12];
        for (i, chroma) in bass.frames.iter().enumerate() {
            let t = bass.frame_time(i);
            if t >= segment.start_s && t < segment.end_s {
                for (s, &c) in sum.iter_mut().zip(chroma.iter()) {
                    *s += c;
                }
            }
        }
        segment.bass_pitch_class = argmax(&sum).map(|pc| pc as u8);
    }
}
