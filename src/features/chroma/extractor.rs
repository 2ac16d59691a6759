//! Chroma vector extraction
//!
//! Folds every spectrogram bin in the configured range (20 Hz–5 kHz by
//! default) onto its nearest equal-tempered pitch class:
//!
//! `pc = round(12·log2(f/440) + 69) mod 12`
//!
//! and normalises each frame to max = 1. The bin→pitch-class table is built
//! once per spectrogram shape and reused for every frame.
//!
//! # Reference
//!
//! Müller, M., & Ewert, S. (2011). Chroma Toolbox: MATLAB Implementations for
//! Extracting Variants of Chroma-Based Audio Features. *ISMIR*.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::normalization::normalise_max;
use super::{Chroma, MAX_OCTAVE, MIN_OCTAVE};
use crate::analysis::context::Suspend;
use crate::config::HarmonyConfig;
use crate::error::AnalysisError;
use crate::features::spectral::scale::{hz_to_midi, nearest_power_of_two};
use crate::features::spectral::stft::{FrameGrid, Spectrogram, MAX_WINDOW, MIN_WINDOW};

/// Per-octave chromagram: octave number (1..=6) → normalised 12-vector
pub type PerOctaveChroma = BTreeMap<u8, Chroma>;

/// Frame grid shared by chroma, chords and mix analysis
///
/// The window is the power of two nearest `window_seconds · sr` (8192 at
/// 44.1 and 48 kHz); the hop is `window / hop_divisor`.
pub fn harmony_grid(
    sample_rate: u32,
    n_samples: usize,
    config: &HarmonyConfig,
) -> Result<FrameGrid, AnalysisError> {
    let window = nearest_power_of_two(
        config.window_seconds * sample_rate as f32,
        MIN_WINDOW,
        MAX_WINDOW,
    );
    let hop = (window / config.hop_divisor.max(1)).max(1);
    FrameGrid::new(sample_rate, n_samples, window, hop)
}

/// Precomputed bin → (pitch class, octave) table
#[derive(Debug, Clone)]
pub struct ChromaMap {
    entries: Vec<(usize, u8, u8)>,
}

impl ChromaMap {
    /// Build the table for `n_bins` bins spaced `bin_hz` apart
    ///
    /// DC and bins outside `[min_hz, max_hz]` are skipped.
    pub fn new(n_bins: usize, bin_hz: f32, min_hz: f32, max_hz: f32) -> Self {
        let entries = (1..n_bins)
            .filter_map(|k| {
                let f = k as f32 * bin_hz;
                if f < min_hz || f > max_hz {
                    return None;
                }
                let midi = hz_to_midi(f).round() as i64;
                let pc = midi.rem_euclid(12) as u8;
                let octave = (midi.div_euclid(12) - 1).clamp(0, u8::MAX as i64) as u8;
                Some((k, pc, octave))
            })
            .collect();
        Self { entries }
    }

    /// Table for a spectrogram under a harmony config
    pub fn for_spectrogram(spectrogram: &Spectrogram, config: &HarmonyConfig) -> Self {
        Self::new(
            spectrogram.n_bins(),
            spectrogram.grid().bin_hz(),
            config.chroma_min_hz,
            config.chroma_max_hz,
        )
    }

    /// Number of bins folded
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no bin falls in range
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add the magnitudes of one frame onto `out` (not normalised)
    pub fn fold(&self, magnitudes: &[f32], out: &mut Chroma) {
        for &(k, pc, _) in &self.entries {
            if let Some(&m) = magnitudes.get(k) {
                if m.is_finite() {
                    out[pc as usize] += m;
                }
            }
        }
    }

    /// Add the magnitudes of one frame onto per-octave accumulators
    ///
    /// `out[o - 1]` receives octave `o`; octaves outside 1..=6 are dropped.
    pub fn fold_octaves(&self, magnitudes: &[f32], out: &mut [Chroma; 6]) {
        for &(k, pc, octave) in &self.entries {
            if !(MIN_OCTAVE..=MAX_OCTAVE).contains(&octave) {
                continue;
            }
            if let Some(&m) = magnitudes.get(k) {
                if m.is_finite() {
                    out[(octave - 1) as usize][pc as usize] += m;
                }
            }
        }
    }
}

/// Chroma of one magnitude frame, normalised to max = 1
///
/// A silent frame yields the zero vector.
pub fn frame_chroma(magnitudes: &[f32], map: &ChromaMap) -> Chroma {
    let mut chroma = [0.0f32; 12];
    map.fold(magnitudes, &mut chroma);
    normalise_max(&mut chroma);
    chroma
}

/// Mean of per-frame chroma vectors, renormalised to max = 1
pub fn global_chroma(frames: &[Chroma]) -> Chroma {
    let mut global = [0.0f32; 12];
    if frames.is_empty() {
        return global;
    }
    for frame in frames {
        for (g, &v) in global.iter_mut().zip(frame.iter()) {
            *g += v;
        }
    }
    let n = frames.len() as f32;
    for g in global.iter_mut() {
        *g /= n;
    }
    normalise_max(&mut global);
    global
}

/// Chromagram of a recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chromagram {
    /// Frame grid of the harmony spectrogram
    pub grid: FrameGrid,

    /// Per-frame chroma, each normalised to max = 1 (zero when silent)
    pub frames: Vec<Chroma>,

    /// Mean chroma over all frames, normalised to max = 1
    pub global: Chroma,

    /// Per-octave chroma over the whole recording, if requested
    pub per_octave: Option<PerOctaveChroma>,
}

impl Chromagram {
    /// Number of frames
    pub fn n_frames(&self) -> usize {
        self.frames.len()
    }

    /// True if frame `i` carried no energy in the chroma range
    pub fn is_silent(&self, i: usize) -> bool {
        self.frames
            .get(i)
            .is_none_or(|f| f.iter().all(|&v| v == 0.0))
    }

    /// Centre time of frame `i` in seconds
    pub fn frame_time(&self, i: usize) -> f32 {
        self.grid.centre_time(i)
    }
}

/// Extract the chromagram from a harmony spectrogram
///
/// Passes a suspension point after every frame.
///
/// # Example
///
/// ```
/// use stratum_studio::analysis::context::NoSuspend;
/// use stratum_studio::config::HarmonyConfig;
/// use stratum_studio::features::chroma::{extract_chroma, harmony_grid};
/// use stratum_studio::features::spectral::{stft, WindowType};
/// use stratum_studio::AudioBuffer;
///
/// let sr = 22050;
/// let samples: Vec<f32> = (0..sr * 2)
///     .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / sr as f32).sin())
///     .collect();
/// let buffer = AudioBuffer::mono(samples, sr as u32)?;
/// let config = HarmonyConfig::default();
/// let grid = harmony_grid(buffer.sample_rate(), buffer.len(), &config)?;
/// let spec = stft(&buffer, &grid, WindowType::Hann)?;
/// let chroma = extract_chroma(&spec, &config, &mut NoSuspend)?;
/// assert_eq!(chroma.global[9], 1.0); // A
/// # Ok::<(), stratum_studio::AnalysisError>(())
/// ```
pub fn extract_chroma(
    spectrogram: &Spectrogram,
    config: &HarmonyConfig,
    suspend: &mut dyn Suspend,
) -> Result<Chromagram, AnalysisError> {
    log::debug!(
        "Extracting chroma: {} frames, {} bins, range {}..{} Hz",
        spectrogram.n_frames(),
        spectrogram.n_bins(),
        config.chroma_min_hz,
        config.chroma_max_hz
    );

    let map = ChromaMap::for_spectrogram(spectrogram, config);
    let mut frames = Vec::with_capacity(spectrogram.n_frames());
    let mut octaves = [[0.0f32; 12]; 6];

    for magnitudes in spectrogram.frames() {
        suspend.checkpoint()?;
        frames.push(frame_chroma(magnitudes, &map));
        if config.per_octave {
            map.fold_octaves(magnitudes, &mut octaves);
        }
    }

    let per_octave = config.per_octave.then(|| {
        octaves
            .iter()
            .enumerate()
            .map(|(i, raw)| {
                let mut c = *raw;
                normalise_max(&mut c);
                (i as u8 + MIN_OCTAVE, c)
            })
            .collect::<PerOctaveChroma>()
    });

    let global = global_chroma(&frames);
    let silent = frames.iter().filter(|f| f.iter().all(|&v| v == 0.0)).count();
    log::debug!(
        "Chroma extracted: {} frames ({} silent), global peak at pitch class {:?}",
        frames.len(),
        silent,
        super::argmax(&global)
    );

    Ok(Chromagram {
        grid: *spectrogram.grid(),
        frames,
        global,
        per_octave,
    })
}
