//! Problem-frequency regions
//!
//! Each named region is compared, per analysis window, with the mean level
//! of its flanks: the regions of equal log width directly below and above.
//!
//! | Region   | Range (Hz) | Flanks (Hz)             |
//! |----------|-----------|--------------------------|
//! | muddy    | 200-400   | 100-200, 400-800         |
//! | boxy     | 400-800   | 200-400, 800-1600        |
//! | harsh    | 2000-5000 | 800-2000, 5000-12500     |
//! | sibilant | 5000-8000 | 3125-5000, 8000-12800    |
//!
//! Consecutive windows carrying the same problem are merged into one issue
//! holding the largest excess.

use serde::{Deserialize, Serialize};

use super::{analysis_windows, Severity};
use crate::analysis::context::Suspend;
use crate::config::MixConfig;
use crate::error::AnalysisError;
use crate::features::spectral::scale::amplitude_to_db;
use crate::features::spectral::stft::Spectrogram;

/// Named problem region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProblemKind {
    /// 200-400 Hz build-up
    Muddy,
    /// 400-800 Hz honk
    Boxy,
    /// 2-5 kHz edge
    Harsh,
    /// 5-8 kHz esses
    Sibilant,
}

impl ProblemKind {
    /// All regions
    pub const ALL: [ProblemKind; 4] = [
        ProblemKind::Muddy,
        ProblemKind::Boxy,
        ProblemKind::Harsh,
        ProblemKind::Sibilant,
    ];

    /// Region in Hz
    pub fn range_hz(&self) -> (f32, f32) {
        match self {
            ProblemKind::Muddy => (200.0, 400.0),
            ProblemKind::Boxy => (400.0, 800.0),
            ProblemKind::Harsh => (2000.0, 5000.0),
            ProblemKind::Sibilant => (5000.0, 8000.0),
        }
    }

    /// Flanking regions below and above, each as wide (in octaves) as the region
    pub fn flanks_hz(&self) -> [(f32, f32); 2] {
        let (lo, hi) = self.range_hz();
        let ratio = hi / lo;
        [(lo / ratio, lo), (hi, hi * ratio)]
    }

    /// Lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            ProblemKind::Muddy => "muddy",
            ProblemKind::Boxy => "boxy",
            ProblemKind::Harsh => "harsh",
            ProblemKind::Sibilant => "sibilant",
        }
    }

    fn advice(&self) -> &'static str {
        match self {
            ProblemKind::Muddy => "cut low-mids on pads, guitars or the bass",
            ProblemKind::Boxy => "cut a narrow band on vocals or snare",
            ProblemKind::Harsh => "tame the upper mids or soften the transients",
            ProblemKind::Sibilant => "use a de-esser on the vocal",
        }
    }
}

/// A problem region over a time span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyProblem {
    /// Which region
    pub kind: ProblemKind,
    /// Severity of the largest excess
    pub severity: Severity,
    /// Start in seconds
    pub start_s: f32,
    /// End in seconds
    pub end_s: f32,
    /// Region lower bound in Hz
    pub low_hz: f32,
    /// Region upper bound in Hz
    pub high_hz: f32,
    /// Largest excess over the flanks in dB
    pub excess_db: f32,
    /// Human-readable summary
    pub description: String,
}

/// Severity for an excess, or `None` below the mild threshold
pub fn problem_severity(excess_db: f32, thresholds: (f32, f32, f32)) -> Option<Severity> {
    let (mild, moderate, severe) = thresholds;
    if excess_db >= severe {
        Some(Severity::Severe)
    } else if excess_db >= moderate {
        Some(Severity::Moderate)
    } else if excess_db >= mild {
        Some(Severity::Mild)
    } else {
        None
    }
}

/// Mean magnitude of `range` over frames `[start, end)`
fn region_level(
    spectrogram: &Spectrogram,
    range: &std::ops::Range<usize>,
    start: usize,
    end: usize,
) -> f32 {
    if range.is_empty() || end <= start {
        return 0.0;
    }
    let mut sum = 0.0f32;
    for i in start..end {
        sum += spectrogram.frame(i)[range.clone()].iter().sum::<f32>();
    }
    sum / ((end - start) * range.len()) as f32
}

/// Scan every window for the four problem regions
pub fn detect_problems(
    spectrogram: &Spectrogram,
    config: &MixConfig,
    suspend: &mut dyn Suspend,
) -> Result<Vec<FrequencyProblem>, AnalysisError> {
    let windows = analysis_windows(spectrogram.grid(), config.window_s);
    log::debug!("Scanning {} windows for problem regions", windows.len());

    let nyquist = spectrogram.sample_rate() as f32 / 2.0;
    let mut problems: Vec<FrequencyProblem> = Vec::new();

    for kind in ProblemKind::ALL {
        let (lo, hi) = kind.range_hz();
        let [below, above] = kind.flanks_hz();
        if above.1 > nyquist {
            log::debug!("Skipping {} check: flank above Nyquist", kind.name());
            continue;
        }
        let region = spectrogram.bin_range(lo, hi);
        let flank_lo = spectrogram.bin_range(below.0, below.1);
        let flank_hi = spectrogram.bin_range(above.0, above.1);

        // (last window index, issue) for merging runs
        let mut run: Option<(usize, FrequencyProblem)> = None;
        for window in &windows {
            suspend.checkpoint()?;
            let (s, e) = (window.start_frame, window.end_frame);
            let level = amplitude_to_db(region_level(spectrogram, &region, s, e));
            let flank = 0.5
                * (amplitude_to_db(region_level(spectrogram, &flank_lo, s, e))
                    + amplitude_to_db(region_level(spectrogram, &flank_hi, s, e)));
            let excess = level - flank;

            let Some(severity) = problem_severity(excess, config.problem_db) else {
                if let Some((_, issue)) = run.take() {
                    problems.push(issue);
                }
                continue;
            };

            match run.as_mut() {
                Some((last, issue)) if *last + 1 == window.index => {
                    *last = window.index;
                    issue.end_s = window.end_s;
                    if excess > issue.excess_db {
                        issue.excess_db = excess;
                        issue.severity = severity;
                    }
                }
                _ => {
                    if let Some((_, issue)) = run.take() {
                        problems.push(issue);
                    }
                    run = Some((
                        window.index,
                        FrequencyProblem {
                            kind,
                            severity,
                            start_s: window.start_s,
                            end_s: window.end_s,
                            low_hz: lo,
                            high_hz: hi,
                            excess_db: excess,
                            description: String::new(),
                        },
                    ));
                }
            }
        }
        if let Some((_, issue)) = run.take() {
            problems.push(issue);
        }
    }

    for p in problems.iter_mut() {
        p.description = format!(
            "{} {}: {:.0}-{:.0} Hz sits {:.1} dB above its surroundings from {:.1}s to {:.1}s; {}",
            p.severity.name(),
            p.kind.name(),
            p.low_hz,
            p.high_hz,
            p.excess_db,
            p.start_s,
            p.end_s,
            p.kind.advice()
        );
    }
    problems.sort_by(|a, b| {
        a.start_s
            .partial_cmp(&b.start_s)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    log::debug!("Found {} problem regions", problems.len());
    Ok(problems)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::context::NoSuspend;
    use crate::features::spectral::stft::{FrameGrid, WindowType};

    /// Flat spectrum with a boost between `lo` and `hi` in the first `boosted` frames
    fn spectrogram(n_seconds: usize, boost: f32, lo: f32, hi: f32, boosted: usize) -> Spectrogram {
        let grid = FrameGrid::new(44100, 44100 * n_seconds, 8192, 2048).unwrap();
        let n_bins = grid.n_bins();
        let bin_hz = grid.bin_hz();
        let mut mags = Vec::with_capacity(grid.n_frames * n_bins);
        for i in 0..grid.n_frames {
            for k in 0..n_bins {
                let f = k as f32 * bin_hz;
                let v = if i < boosted && f >= lo && f < hi { boost } else { 0.01 };
                mags.push(v);
            }
        }
        Spectrogram::from_magnitudes(grid, WindowType::Hann, mags).unwrap()
    }

    #[test]
    fn test_flanks_equal_log_width() {
        let [below, above] = ProblemKind::Muddy.flanks_hz();
        assert_eq!(below, (100.0, 200.0));
        assert_eq!(above, (400.0, 800.0));
    }

    #[test]
    fn test_severity_thresholds() {
        let t = (3.0, 5.0, 8.0);
        assert_eq!(problem_severity(2.9, t), None);
        assert_eq!(problem_severity(3.0, t), Some(Severity::Mild));
        assert_eq!(problem_severity(6.0, t), Some(Severity::Moderate));
        assert_eq!(problem_severity(8.0, t), Some(Severity::Severe));
    }

    #[test]
    fn test_flat_spectrum_has_no_problems() {
        let spec = spectrogram(4, 0.01, 0.0, 0.0, 0);
        let problems = detect_problems(&spec, &MixConfig::default(), &mut NoSuspend).unwrap();
        assert!(problems.is_empty());
    }

    #[test]
    fn test_muddy_region_merged_over_windows() {
        // +12 dB between 200 and 400 Hz for the whole buffer
        let spec = spectrogram(4, 0.04, 200.0, 400.0, usize::MAX);
        let problems = detect_problems(&spec, &MixConfig::default(), &mut NoSuspend).unwrap();
        assert_eq!(problems.len(), 1);
        let p = &problems[0];
        assert_eq!(p.kind, ProblemKind::Muddy);
        // Flanks sit 12 dB below: severe
        assert_eq!(p.severity, Severity::Severe);
        assert_eq!(p.start_s, 0.0);
        assert!(p.end_s > 3.0);
        assert!(p.description.contains("muddy"));
    }
}
