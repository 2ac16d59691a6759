//! Mix analysis
//!
//! Inspects a mix over the shared harmony spectrogram and its seven-band
//! reduction:
//! - Problem regions (muddy, boxy, harsh, sibilant) per 1 s window
//! - Masking between adjacent bands
//! - Sustained resonances
//! - Segment loudness (BS.1770), integrated loudness and dynamic range
//! - Band-by-band comparison against a reference

pub mod loudness;
pub mod masking;
pub mod problems;
pub mod reference;
pub mod resonance;

pub use loudness::{measure_loudness, LoudnessReport, LoudnessSegment};
pub use masking::{detect_masking, MaskingIssue};
pub use problems::{detect_problems, FrequencyProblem, ProblemKind};
pub use reference::{compare_to_reference, EqMove, ReferenceComparison};
pub use resonance::{detect_resonances, Resonance};

use serde::{Deserialize, Serialize};

use crate::analysis::context::Suspend;
use crate::config::MixConfig;
use crate::error::AnalysisError;
use crate::features::spectral::bands::{BandSpectrogram, N_BANDS};
use crate::features::spectral::stft::{FrameGrid, Spectrogram};
use crate::io::AudioBuffer;

/// Issue severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Worth a look
    Mild,
    /// Likely audible
    Moderate,
    /// Clearly audible
    Severe,
}

impl Severity {
    /// Wire name
    pub fn name(&self) -> &'static str {
        match self {
            Severity::Mild => "mild",
            Severity::Moderate => "moderate",
            Severity::Severe => "severe",
        }
    }
}

/// Issue counts by severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueSummary {
    /// Severe issues
    pub severe: usize,
    /// Moderate issues
    pub moderate: usize,
    /// Mild issues
    pub mild: usize,
}

impl IssueSummary {
    /// Count one issue
    pub fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Severe => self.severe += 1,
            Severity::Moderate => self.moderate += 1,
            Severity::Mild => self.mild += 1,
        }
    }

    /// Total issue count
    pub fn total(&self) -> usize {
        self.severe + self.moderate + self.mild
    }
}

/// Complete mix report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixReport {
    /// Problem regions
    pub problems: Vec<FrequencyProblem>,
    /// Masking between adjacent bands
    pub masking: Vec<MaskingIssue>,
    /// Sustained resonances
    pub resonances: Vec<Resonance>,
    /// Loudness measurements
    pub loudness: LoudnessReport,
    /// Mean level of each band over the whole buffer in dB
    pub band_energies_db: [f32; N_BANDS],
    /// Comparison against a reference, when one was supplied
    pub reference: Option<ReferenceComparison>,
    /// Issue counts
    pub summary: IssueSummary,
    /// Wall-clock time of the analysis in ms since the Unix epoch
    pub analysed_at: u64,
}

/// Consecutive analysis windows over a frame grid
///
/// Window `w` holds the frames whose centre lies in
/// `[w·window_s, (w+1)·window_s)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisWindow {
    /// Window number
    pub index: usize,
    /// First frame
    pub start_frame: usize,
    /// One past the last frame
    pub end_frame: usize,
    /// Window start in seconds
    pub start_s: f32,
    /// Window end in seconds (clamped to the buffer)
    pub end_s: f32,
}

/// Split a frame grid into windows of `window_s` seconds
pub fn analysis_windows(grid: &FrameGrid, window_s: f32) -> Vec<AnalysisWindow> {
    let duration = grid.n_samples as f32 / grid.sample_rate as f32;
    let mut windows: Vec<AnalysisWindow> = Vec::new();
    if window_s <= 0.0 {
        return windows;
    }
    for i in 0..grid.n_frames {
        let index = (grid.centre_time(i) / window_s).floor().max(0.0) as usize;
        match windows.last_mut() {
            Some(w) if w.index == index => w.end_frame = i + 1,
            _ => {
                let start_s = index as f32 * window_s;
                windows.push(AnalysisWindow {
                    index,
                    start_frame: i,
                    end_frame: i + 1,
                    start_s,
                    end_s: (start_s + window_s).min(duration.max(start_s)),
                });
            }
        }
    }
    windows
}

/// Run every mix check
///
/// `spectrogram` and `bands` must come from the same harmony STFT of
/// `buffer`. `reference_db` holds reference band levels in dB.
pub fn analyse_mix(
    buffer: &AudioBuffer,
    spectrogram: &Spectrogram,
    bands: &BandSpectrogram,
    reference_db: Option<&[f32; N_BANDS]>,
    config: &MixConfig,
    suspend: &mut dyn Suspend,
) -> Result<MixReport, AnalysisError> {
    log::debug!(
        "Analysing mix: {:.2}s, {} frames",
        buffer.duration_seconds(),
        spectrogram.n_frames()
    );

    let band_energies_db = bands.mean_db();
    let problems = detect_problems(spectrogram, config, suspend)?;
    let masking = detect_masking(bands, config, suspend)?;
    let resonances = detect_resonances(spectrogram, config, suspend)?;
    let loudness = measure_loudness(buffer, config, suspend)?;
    let reference = reference_db.map(|r| compare_to_reference(&band_energies_db, r, config));

    let mut summary = IssueSummary::default();
    problems.iter().for_each(|p| summary.add(p.severity));
    masking.iter().for_each(|m| summary.add(m.severity));
    resonances.iter().for_each(|r| summary.add(r.severity));

    let analysed_at = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    log::debug!(
        "Mix analysed: {} problems, {} masking, {} resonances, {:.1} LUFS integrated",
        problems.len(),
        masking.len(),
        resonances.len(),
        loudness.integrated_lufs
    );

    Ok(MixReport {
        problems,
        masking,
        resonances,
        loudness,
        band_energies_db,
        reference,
        summary,
        analysed_at,
    })
}
