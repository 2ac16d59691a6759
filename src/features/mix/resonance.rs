//! Sustained resonances
//!
//! # Algorithm
//!
//! 1. Per-bin temporal median of the dB spectrogram
//! 2. Gaussian smoothing of the median spectrum across bins (σ = 10 bins)
//! 3. A bin is resonant when its level exceeds the smoothed median by at
//!    least `resonance_db` in at least `resonance_min_fraction` of frames
//! 4. Adjacent resonant bins form one resonance; severity comes from the
//!    median excess of its strongest bin

use serde::{Deserialize, Serialize};

use super::Severity;
use crate::analysis::context::Suspend;
use crate::config::MixConfig;
use crate::error::AnalysisError;
use crate::features::onset::threshold::median_in_place;
use crate::features::spectral::scale::amplitude_to_db;
use crate::features::spectral::stft::Spectrogram;

/// A narrow band that rings over most of the buffer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resonance {
    /// Frequency of the strongest bin in Hz
    pub frequency_hz: f32,
    /// Lowest resonant bin in Hz
    pub low_hz: f32,
    /// Highest resonant bin in Hz
    pub high_hz: f32,
    /// Median excess of the strongest bin over the smoothed spectrum in dB
    pub excess_db: f32,
    /// Largest fraction of frames in which a bin of the group was resonant
    pub frame_fraction: f32,
    /// Severity
    pub severity: Severity,
    /// Human-readable summary
    pub description: String,
}

/// Gaussian smoothing with edge renormalisation
pub fn gaussian_smooth(values: &[f32], sigma: f32) -> Vec<f32> {
    if values.is_empty() || sigma.is_nan() || sigma <= 0.0 {
        return values.to_vec();
    }
    let radius = (3.0 * sigma).ceil() as isize;
    let kernel: Vec<f32> = (-radius..=radius)
        .map(|d| (-(d * d) as f32 / (2.0 * sigma * sigma)).exp())
        .collect();

    let n = values.len() as isize;
    (0..n)
        .map(|i| {
            let mut sum = 0.0f32;
            let mut weight = 0.0f32;
            for (j, &w) in kernel.iter().enumerate() {
                let k = i + j as isize - radius;
                if (0..n).contains(&k) {
                    sum += w * values[k as usize];
                    weight += w;
                }
            }
            sum / weight
        })
        .collect()
}

fn resonance_severity(excess_db: f32, bounds: (f32, f32)) -> Severity {
    if excess_db < bounds.0 {
        Severity::Mild
    } else if excess_db < bounds.1 {
        Severity::Moderate
    } else {
        Severity::Severe
    }
}

fn fill_column(spectrogram: &Spectrogram, bin: usize, column: &mut Vec<f32>) {
    column.clear();
    column.extend(spectrogram.frames().map(|f| amplitude_to_db(f[bin])));
}

/// Find sustained resonances
///
/// Passes a suspension point for every bin of each pass.
pub fn detect_resonances(
    spectrogram: &Spectrogram,
    config: &MixConfig,
    suspend: &mut dyn Suspend,
) -> Result<Vec<Resonance>, AnalysisError> {
    let n_frames = spectrogram.n_frames();
    let n_bins = spectrogram.n_bins();
    if n_frames == 0 || n_bins < 2 {
        return Ok(Vec::new());
    }
    log::debug!(
        "Scanning {} bins × {} frames for resonances",
        n_bins,
        n_frames
    );

    let mut column = Vec::with_capacity(n_frames);

    // Median spectrum over bins 1.. (DC excluded)
    let mut median_db = Vec::with_capacity(n_bins - 1);
    for bin in 1..n_bins {
        suspend.checkpoint()?;
        fill_column(spectrogram, bin, &mut column);
        median_db.push(median_in_place(&mut column));
    }
    let smoothed = gaussian_smooth(&median_db, config.resonance_sigma_bins);

    let (lo_hz, hi_hz) = config.resonance_range_hz;
    let range = spectrogram.bin_range(lo_hz, hi_hz);
    let start = range.start.max(1);

    // (bin, median excess, fraction) of resonant bins
    let mut resonant: Vec<(usize, f32, f32)> = Vec::new();
    for bin in start..range.end {
        suspend.checkpoint()?;
        let reference = smoothed[bin - 1];
        fill_column(spectrogram, bin, &mut column);
        let above = column
            .iter()
            .filter(|&&db| db - reference >= config.resonance_db)
            .count();
        let fraction = above as f32 / n_frames as f32;
        if fraction >= config.resonance_min_fraction {
            resonant.push((bin, median_db[bin - 1] - reference, fraction));
        }
    }

    let mut resonances: Vec<Resonance> = Vec::new();
    let mut group: Vec<(usize, f32, f32)> = Vec::new();
    let mut flush = |group: &mut Vec<(usize, f32, f32)>| {
        let Some(&(first, _, _)) = group.first() else {
            return;
        };
        let last = group.last().map(|g| g.0).unwrap_or(first);
        let (peak, excess) = group
            .iter()
            .map(|&(bin, excess, _)| (bin, excess))
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .unwrap_or((first, 0.0));
        let fraction = group.iter().map(|g| g.2).fold(0.0f32, f32::max);
        let severity = resonance_severity(excess, config.resonance_severity_db);
        let frequency_hz = spectrogram.bin_frequency(peak);
        resonances.push(Resonance {
            frequency_hz,
            low_hz: spectrogram.bin_frequency(first),
            high_hz: spectrogram.bin_frequency(last),
            excess_db: excess,
            frame_fraction: fraction,
            severity,
            description: format!(
                "{} resonance at {:.0} Hz ({:.1} dB above the surrounding spectrum in {:.0}% of the track): notch it with a narrow cut",
                severity.name(),
                frequency_hz,
                excess,
                fraction * 100.0
            ),
        });
        group.clear();
    };

    for entry in resonant {
        if group.last().is_some_and(|g| g.0 + 1 != entry.0) {
            flush(&mut group);
        }
        group.push(entry);
    }
    flush(&mut group);

    log::debug!("Found {} resonances", resonances.len());
    Ok(resonances)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::context::NoSuspend;
    use crate::features::spectral::stft::{FrameGrid, WindowType};

    #[test]
    fn test_gaussian_smooth_preserves_constant() {
        let smoothed = gaussian_smooth(&[2.0; 50], 10.0);
        assert!(smoothed.iter().all(|&v| (v - 2.0).abs() < 1e-5));
        assert_eq!(gaussian_smooth(&[1.0, 5.0], 0.0), vec![1.0, 5.0]);
    }

    #[test]
    fn test_severity_bounds() {
        assert_eq!(resonance_severity(7.0, (9.0, 12.0)), Severity::Mild);
        assert_eq!(resonance_severity(9.0, (9.0, 12.0)), Severity::Moderate);
        assert_eq!(resonance_severity(12.0, (9.0, 12.0)), Severity::Severe);
    }

    #[test]
    fn test_single_peak_found() {
        let grid = FrameGrid::new(44100, 44100 * 3, 8192, 2048).unwrap();
        let n_bins = grid.n_bins();
        let peak_bin = 186; // ≈ 1001 Hz
        let mut mags = Vec::with_capacity(grid.n_frames * n_bins);
        for i in 0..grid.n_frames {
            for k in 0..n_bins {
                // Peak present in 3 of every 4 frames
                let v = if k == peak_bin && i % 4 != 0 { 0.05 } else { 0.01 };
                mags.push(v);
            }
        }
        let spec = Spectrogram::from_magnitudes(grid, WindowType::Hann, mags).unwrap();
        let found = detect_resonances(&spec, &MixConfig::default(), &mut NoSuspend).unwrap();
        assert_eq!(found.len(), 1);
        let r = &found[0];
        assert!((r.frequency_hz - spec.bin_frequency(peak_bin)).abs() < 1e-3);
        assert_eq!(r.low_hz, r.high_hz);
        // 14 dB over a floor lifted by the smoothing kernel
        assert!(r.excess_db > 12.0 && r.excess_db < 14.0);
        assert_eq!(r.severity, Severity::Severe);
        assert!(r.frame_fraction >= 0.7);
    }

    #[test]
    fn test_flat_spectrum_has_no_resonance() {
        let grid = FrameGrid::new(44100, 44100 * 2, 8192, 2048).unwrap();
        let mags = vec![0.01; grid.n_frames * grid.n_bins()];
        let spec = Spectrogram::from_magnitudes(grid, WindowType::Hann, mags).unwrap();
        assert!(detect_resonances(&spec, &MixConfig::default(), &mut NoSuspend)
            .unwrap()
            .is_empty());
    }
}
