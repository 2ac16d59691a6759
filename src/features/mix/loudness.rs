//! Segment loudness (ITU-R BS.1770)
//!
//! # Algorithm
//!
//! 1. K-weighting per channel: high-shelf pre-filter followed by the RLB
//!    high-pass, both designed for the buffer's sample rate
//! 2. Mean square per segment, summed over channels
//! 3. `LUFS = -0.691 + 10·log10(power)`
//! 4. Integrated loudness: power mean of the segments above the absolute
//!    gate, then again over the segments above `integrated + relative gate`
//! 5. Dynamic range: 95th minus 10th percentile of the gated segment
//!    loudness
//!
//! # Reference
//!
//! ITU-R BS.1770-4 (2015). Algorithms to measure audio programme loudness
//! and true-peak audio level.

use serde::{Deserialize, Serialize};

use crate::analysis::context::Suspend;
use crate::config::MixConfig;
use crate::error::AnalysisError;
use crate::features::onset::threshold::percentile;
use crate::features::spectral::scale::amplitude_to_db;
use crate::io::AudioBuffer;

/// Loudness reported for silence
pub const SILENT_LUFS: f32 = -120.0;

/// Loudness of one segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoudnessSegment {
    /// Start in seconds
    pub start_s: f32,
    /// End in seconds
    pub end_s: f32,
    /// K-weighted loudness in LUFS
    pub lufs: f32,
}

/// Loudness measurements of a buffer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoudnessReport {
    /// Per-segment loudness
    pub segments: Vec<LoudnessSegment>,
    /// Gated integrated loudness in LUFS
    pub integrated_lufs: f32,
    /// Sample peak in dBFS
    pub peak_dbfs: f32,
    /// 95th minus 10th percentile of gated segment loudness in LU
    pub dynamic_range_db: f32,
    /// Start of the loudest segment in seconds
    pub loudest_s: f32,
}

/// Transposed direct-form II biquad
#[derive(Debug, Clone, Copy)]
struct Biquad {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
    z1: f64,
    z2: f64,
}

impl Biquad {
    fn new(b0: f64, b1: f64, b2: f64, a1: f64, a2: f64) -> Self {
        Self {
            b0,
            b1,
            b2,
            a1,
            a2,
            z1: 0.0,
            z2: 0.0,
        }
    }

    /// Stage 1: high shelf, +4 dB above ~1.7 kHz
    fn k_shelf(sample_rate: u32) -> Self {
        let f0 = 1681.974450955533;
        let gain_db = 3.999843853973347;
        let q = 0.7071752369554196;

        let k = (std::f64::consts::PI * f0 / sample_rate as f64).tan();
        let vh = 10f64.powf(gain_db / 20.0);
        let vb = vh.powf(0.4996667741545416);
        let a0 = 1.0 + k / q + k * k;
        Self::new(
            (vh + vb * k / q + k * k) / a0,
            2.0 * (k * k - vh) / a0,
            (vh - vb * k / q + k * k) / a0,
            2.0 * (k * k - 1.0) / a0,
            (1.0 - k / q + k * k) / a0,
        )
    }

    /// Stage 2: RLB high-pass at ~38 Hz
    fn rlb_high_pass(sample_rate: u32) -> Self {
        let f0 = 38.13547087602444;
        let q = 0.5003270373238773;

        let k = (std::f64::consts::PI * f0 / sample_rate as f64).tan();
        let a0 = 1.0 + k / q + k * k;
        Self::new(
            1.0,
            -2.0,
            1.0,
            2.0 * (k * k - 1.0) / a0,
            (1.0 - k / q + k * k) / a0,
        )
    }

    #[inline]
    fn process(&mut self, input: f64) -> f64 {
        let output = input * self.b0 + self.z1;
        self.z1 = input * self.b1 + self.z2 - self.a1 * output;
        self.z2 = input * self.b2 - self.a2 * output;
        output
    }
}

/// Power to LUFS
pub fn power_to_lufs(power: f64) -> f32 {
    if power.is_nan() || power <= 0.0 {
        return SILENT_LUFS;
    }
    ((-0.691 + 10.0 * power.log10()) as f32).max(SILENT_LUFS)
}

fn mean_power(powers: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = powers.fold((0.0, 0usize), |(s, n), p| (s + p, n + 1));
    (n > 0).then(|| sum / n as f64)
}

/// Measure segment, integrated and peak loudness
///
/// The trailing partial segment is kept when it spans at least half a
/// segment, or when it is the only one. Passes a suspension point per
/// segment and channel.
pub fn measure_loudness(
    buffer: &AudioBuffer,
    config: &MixConfig,
    suspend: &mut dyn Suspend,
) -> Result<LoudnessReport, AnalysisError> {
    let sr = buffer.sample_rate();
    let n = buffer.len();
    let seg_len = ((config.loudness_segment_s * sr as f32).round() as usize).max(1);

    let full = n / seg_len;
    let remainder = n % seg_len;
    let n_segments = if remainder > 0 && (remainder * 2 >= seg_len || full == 0) {
        full + 1
    } else {
        full
    };
    log::debug!(
        "Measuring loudness: {} channels, {} segments of {} samples",
        buffer.channel_count(),
        n_segments,
        seg_len
    );

    let mut powers = vec![0.0f64; n_segments];
    let mut peak = 0.0f32;
    for channel in buffer.channels() {
        // Sample peak covers the whole channel, including a dropped remainder
        peak = channel.iter().fold(peak, |m, x| m.max(x.abs()));
        let mut shelf = Biquad::k_shelf(sr);
        let mut high_pass = Biquad::rlb_high_pass(sr);
        for (seg, power) in powers.iter_mut().enumerate() {
            suspend.checkpoint()?;
            let start = seg * seg_len;
            let end = (start + seg_len).min(n);
            let mut sum_sq = 0.0f64;
            for &x in &channel[start..end] {
                let y = high_pass.process(shelf.process(x as f64));
                sum_sq += y * y;
            }
            *power += sum_sq / (end - start).max(1) as f64;
        }
    }

    let segments: Vec<LoudnessSegment> = powers
        .iter()
        .enumerate()
        .map(|(i, &p)| LoudnessSegment {
            start_s: (i * seg_len) as f32 / sr as f32,
            end_s: ((i + 1) * seg_len).min(n) as f32 / sr as f32,
            lufs: power_to_lufs(p),
        })
        .collect();

    // Two-stage gating
    let above_absolute: Vec<(f64, f32)> = powers
        .iter()
        .zip(segments.iter())
        .map(|(&p, s)| (p, s.lufs))
        .filter(|&(_, lufs)| lufs > config.absolute_gate_lufs)
        .collect();
    let integrated_lufs = match mean_power(above_absolute.iter().map(|&(p, _)| p)) {
        Some(ungated) => {
            let relative_gate = power_to_lufs(ungated) + config.relative_gate_lu;
            let gated = above_absolute
                .iter()
                .filter(|&&(_, lufs)| lufs > relative_gate)
                .map(|&(p, _)| p);
            power_to_lufs(mean_power(gated).unwrap_or(ungated))
        }
        None => SILENT_LUFS,
    };

    let gated_lufs: Vec<f32> = above_absolute.iter().map(|&(_, lufs)| lufs).collect();
    let dynamic_range_db = if gated_lufs.is_empty() {
        0.0
    } else {
        (percentile(&gated_lufs, 0.95) - percentile(&gated_lufs, 0.10)).max(0.0)
    };

    let loudest_s = segments
        .iter()
        .max_by(|a, b| {
            a.lufs
                .partial_cmp(&b.lufs)
                .unwrap_or(std::cmp::Ordering::Equal)
                // Earlier segment wins ties
                .then(std::cmp::Ordering::Greater)
        })
        .map(|s| s.start_s)
        .unwrap_or(0.0);

    log::debug!(
        "Loudness: integrated {:.2} LUFS, peak {:.2} dBFS, DR {:.1} LU",
        integrated_lufs,
        amplitude_to_db(peak),
        dynamic_range_db
    );

    Ok(LoudnessReport {
        segments,
        integrated_lufs,
        peak_dbfs: amplitude_to_db(peak),
        dynamic_range_db,
        loudest_s,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::context::NoSuspend;

    fn sine(freq: f32, amp: f32, seconds: f32, sr: u32) -> Vec<f32> {
        (0..(seconds * sr as f32) as usize)
            .map(|i| amp * (2.0 * std::f32::consts::PI * freq * i as f32 / sr as f32).sin())
            .collect()
    }

    fn measure(buffer: &AudioBuffer) -> LoudnessReport {
        measure_loudness(buffer, &MixConfig::default(), &mut NoSuspend).unwrap()
    }

    #[test]
    fn test_k_weighting_reference_tone() {
        // A 997 Hz sine at -6.02 dBFS reads -9.03 LUFS on one channel
        let buffer = AudioBuffer::mono(sine(997.0, 0.5, 5.0, 48000), 48000).unwrap();
        let report = measure(&buffer);
        assert_eq!(report.segments.len(), 5);
        assert!(
            (report.integrated_lufs + 9.03).abs() < 0.2,
            "integrated {}",
            report.integrated_lufs
        );
        assert!((report.peak_dbfs + 6.02).abs() < 0.05);
    }

    #[test]
    fn test_stereo_channels_sum() {
        let s = sine(997.0, 0.5, 3.0, 44100);
        let mono = measure(&AudioBuffer::mono(s.clone(), 44100).unwrap());
        let stereo = measure(&AudioBuffer::stereo(s.clone(), s, 44100).unwrap());
        assert!((stereo.integrated_lufs - mono.integrated_lufs - 3.01).abs() < 0.05);
    }

    #[test]
    fn test_relative_gate_and_dynamic_range() {
        let mut samples = sine(997.0, 0.5, 5.0, 44100);
        samples.extend(sine(997.0, 0.05, 5.0, 44100));
        let report = measure(&AudioBuffer::mono(samples, 44100).unwrap());
        // Quiet half sits 20 LU down, below the relative gate
        assert!((report.integrated_lufs + 9.03).abs() < 0.3);
        assert!((report.dynamic_range_db - 20.0).abs() < 1.0);
        assert!(report.loudest_s < 5.0);
    }

    #[test]
    fn test_silence() {
        let report = measure(&AudioBuffer::mono(vec![0.0; 44100 * 2], 44100).unwrap());
        assert_eq!(report.integrated_lufs, SILENT_LUFS);
        assert!(report.segments.iter().all(|s| s.lufs == SILENT_LUFS));
        assert_eq!(report.dynamic_range_db, 0.0);
    }

    #[test]
    fn test_peak_in_dropped_remainder() {
        // 2.4 s: the 0.4 s remainder is not a segment, but its peak counts
        let mut samples = vec![0.01f32; (2.4 * 44100.0) as usize];
        let n = samples.len();
        samples[n - 100] = 0.9;
        let report = measure(&AudioBuffer::mono(samples, 44100).unwrap());
        assert_eq!(report.segments.len(), 2);
        assert!((report.peak_dbfs - amplitude_to_db(0.9)).abs() < 1e-3);
    }

    #[test]
    fn test_partial_segment_rules() {
        // 2.3 s: trailing 0.3 s dropped
        let report = measure(&AudioBuffer::mono(vec![0.1; 101430], 44100).unwrap());
        assert_eq!(report.segments.len(), 2);
        // 0.4 s alone is kept
        let report = measure(&AudioBuffer::mono(vec![0.1; 17640], 44100).unwrap());
        assert_eq!(report.segments.len(), 1);
        assert!((report.segments[0].end_s - 0.4).abs() < 1e-4);
    }
}
