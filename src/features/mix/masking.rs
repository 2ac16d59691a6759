//! Masking between adjacent bands
//!
//! Per analysis window, band levels are first compensated for a pink
//! (-3 dB/octave) tilt so that a balanced mix reads flat:
//!
//! `L_c = L + 10·log10(f_centre / 1 kHz)`
//!
//! A pair of adjacent bands is evaluated only when both sit at least
//! `masking_congestion_db` above the median compensated level of the
//! window. The score compares the compensated amplitudes:
//!
//! `score = √(E_a·E_b) / max(E_a, E_b) · 100`

use serde::{Deserialize, Serialize};

use super::{analysis_windows, Severity};
use crate::analysis::context::Suspend;
use crate::config::MixConfig;
use crate::error::AnalysisError;
use crate::features::onset::threshold::median;
use crate::features::spectral::bands::{Band, BandSpectrogram, N_BANDS};
use crate::features::spectral::scale::{amplitude_to_db, db_to_amplitude};

/// Two adjacent bands competing over a time span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskingIssue {
    /// Lower band
    pub band_a: Band,
    /// Upper band
    pub band_b: Band,
    /// Highest masking score over the span (0-100)
    pub score: f32,
    /// Severity of the highest score
    pub severity: Severity,
    /// Start in seconds
    pub start_s: f32,
    /// End in seconds
    pub end_s: f32,
    /// Human-readable summary
    pub description: String,
}

/// Masking score of two linear energies (0-100)
///
/// # Example
///
/// ```
/// use stratum_studio::features::mix::masking::masking_score;
///
/// assert_eq!(masking_score(1.0, 1.0), 100.0);
/// assert!((masking_score(1.0, 0.25) - 50.0).abs() < 1e-4);
/// assert_eq!(masking_score(0.0, 0.0), 0.0);
/// ```
pub fn masking_score(a: f32, b: f32) -> f32 {
    let max = a.max(b);
    if max.is_nan() || max <= 0.0 {
        return 0.0;
    }
    (a * b).max(0.0).sqrt() / max * 100.0
}

/// Pink-compensated level in dB for each band
fn compensated_levels(magnitudes: &[f32; N_BANDS]) -> [f32; N_BANDS] {
    std::array::from_fn(|i| {
        amplitude_to_db(magnitudes[i]) + 10.0 * (Band::ALL[i].centre_hz() / 1000.0).log10()
    })
}

/// Scan every window for masking between adjacent bands
pub fn detect_masking(
    bands: &BandSpectrogram,
    config: &MixConfig,
    suspend: &mut dyn Suspend,
) -> Result<Vec<MaskingIssue>, AnalysisError> {
    let windows = analysis_windows(&bands.grid, config.window_s);
    log::debug!("Scanning {} windows for band masking", windows.len());

    let (moderate, severe) = config.masking_score;
    let mut issues: Vec<MaskingIssue> = Vec::new();
    // Open run per adjacent pair: (last window index, issue)
    let mut runs: [Option<(usize, MaskingIssue)>; N_BANDS - 1] = Default::default();

    for window in &windows {
        suspend.checkpoint()?;
        let levels = compensated_levels(&bands.mean_over(window.start_frame, window.end_frame));
        let gate = median(&levels) + config.masking_congestion_db;

        for (pair, run) in runs.iter_mut().enumerate() {
            let (la, lb) = (levels[pair], levels[pair + 1]);
            let score = if la >= gate && lb >= gate {
                masking_score(db_to_amplitude(la), db_to_amplitude(lb))
            } else {
                0.0
            };
            let severity = if score >= severe {
                Some(Severity::Severe)
            } else if score >= moderate {
                Some(Severity::Moderate)
            } else {
                None
            };

            let Some(severity) = severity else {
                if let Some((_, issue)) = run.take() {
                    issues.push(issue);
                }
                continue;
            };
            match run.as_mut() {
                Some((last, issue)) if *last + 1 == window.index => {
                    *last = window.index;
                    issue.end_s = window.end_s;
                    if score > issue.score {
                        issue.score = score;
                        issue.severity = severity;
                    }
                }
                _ => {
                    if let Some((_, issue)) = run.take() {
                        issues.push(issue);
                    }
                    *run = Some((
                        window.index,
                        MaskingIssue {
                            band_a: Band::ALL[pair],
                            band_b: Band::ALL[pair + 1],
                            score,
                            severity,
                            start_s: window.start_s,
                            end_s: window.end_s,
                            description: String::new(),
                        },
                    ));
                }
            }
        }
    }
    issues.extend(runs.into_iter().flatten().map(|(_, issue)| issue));

    for issue in issues.iter_mut() {
        issue.description = format!(
            "{} masking between {} and {} (score {:.0}) from {:.1}s to {:.1}s: carve space in one of them",
            issue.severity.name(),
            issue.band_a.name(),
            issue.band_b.name(),
            issue.score,
            issue.start_s,
            issue.end_s
        );
    }
    issues.sort_by(|a, b| {
        a.start_s
            .partial_cmp(&b.start_s)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    log::debug!("Found {} masking issues", issues.len());
    Ok(issues)
}
