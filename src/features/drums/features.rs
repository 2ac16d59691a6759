//! Per-onset timbral features
//!
//! Computed over a short window starting just before the onset: band power
//! shares, power-weighted spectral centroid, spectral flatness, zero-crossing
//! rate, and the time the envelope takes to fall 20 dB below its peak.

use crate::config::DrumClassifierConfig;
use crate::features::spectral::stft::{StftScratch, WindowType, MAX_WINDOW, MIN_WINDOW};

/// Longest decay measured
pub const MAX_DECAY_MS: f32 = 500.0;

/// RMS block length for decay measurement
pub const DECAY_BLOCK_MS: f32 = 5.0;

const EPSILON: f32 = 1e-12;

/// Feature vector of one hit
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DrumFeatures {
    /// Power share 0–120 Hz
    pub sub: f32,
    /// Power share 120–300 Hz
    pub low: f32,
    /// Power share 300–2000 Hz
    pub mid: f32,
    /// Power share 2–6 kHz
    pub high: f32,
    /// Power share 6–16 kHz
    pub air: f32,
    /// Power share 1–4 kHz
    pub presence: f32,
    /// Power-weighted spectral centroid in Hz
    pub centroid_hz: f32,
    /// Spectral flatness over 20 Hz–16 kHz (0 = tonal, 1 = white)
    pub flatness: f32,
    /// Zero crossings per sample
    pub zcr: f32,
    /// Time from the envelope peak to −20 dB, capped at 500 ms
    pub decay_ms: f32,
    /// Envelope slope over the decay in dB/s (negative)
    pub decay_slope_db_s: f32,
    /// Peak absolute sample in the window
    pub peak: f32,
}

impl DrumFeatures {
    /// The five band shares in order sub, low, mid, high, air
    pub fn bands(&self) -> [f32; 5] {
        [self.sub, self.low, self.mid, self.high, self.air]
    }
}

/// Extract features for an onset at `onset_s`
pub fn extract(
    samples: &[f32],
    sample_rate: u32,
    onset_s: f32,
    config: &DrumClassifierConfig,
    scratch: &mut StftScratch,
    spectrum: &mut Vec<f32>,
) -> DrumFeatures {
    let sr = sample_rate as f32;
    let start_s = (onset_s - config.pre_roll_ms / 1000.0).max(0.0);
    let start = ((start_s * sr) as usize).min(samples.len());
    let len = ((config.window_ms / 1000.0) * sr).round().max(1.0) as usize;
    let end = (start + len).min(samples.len());
    let window = &samples[start..end];
    if window.is_empty() {
        return DrumFeatures::default();
    }

    let fft_size = len.next_power_of_two().clamp(MIN_WINDOW, MAX_WINDOW);
    spectrum.resize(fft_size / 2 + 1, 0.0);
    scratch.magnitude_frame(window, fft_size, WindowType::Hann, spectrum);

    let bin_hz = sr / fft_size as f32;
    let mut band_power = [0.0f32; 5];
    let mut presence = 0.0f32;
    let mut weighted = 0.0f32;
    let mut total = 0.0f32;
    let mut log_sum = 0.0f32;
    let mut lin_sum = 0.0f32;
    let mut flat_n = 0usize;

    for (k, &m) in spectrum.iter().enumerate().skip(1) {
        let f = k as f32 * bin_hz;
        let p = m * m;
        let band = if f < 120.0 {
            Some(0)
        } else if f < 300.0 {
            Some(1)
        } else if f < 2000.0 {
            Some(2)
        } else if f < 6000.0 {
            Some(3)
        } else if f < 16000.0 {
            Some(4)
        } else {
            None
        };
        if let Some(b) = band {
            band_power[b] += p;
            total += p;
        }
        if (1000.0..4000.0).contains(&f) {
            presence += p;
        }
        weighted += f * p;
        if (20.0..16000.0).contains(&f) {
            log_sum += (p + EPSILON).ln();
            lin_sum += p + EPSILON;
            flat_n += 1;
        }
    }

    let all_power: f32 = spectrum.iter().skip(1).map(|m| m * m).sum();
    let share = |p: f32| if total > EPSILON { p / total } else { 0.0 };
    let flatness = if flat_n > 0 && lin_sum > 0.0 {
        ((log_sum / flat_n as f32).exp() / (lin_sum / flat_n as f32)).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let crossings = window
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count();
    let zcr = if window.len() > 1 {
        crossings as f32 / (window.len() - 1) as f32
    } else {
        0.0
    };

    let (decay_ms, decay_slope_db_s) = measure_decay(samples, sample_rate, start);
    let peak = window.iter().fold(0.0f32, |acc, &x| acc.max(x.abs()));

    DrumFeatures {
        sub: share(band_power[0]),
        low: share(band_power[1]),
        mid: share(band_power[2]),
        high: share(band_power[3]),
        air: share(band_power[4]),
        presence: share(presence),
        centroid_hz: if all_power > EPSILON { weighted / all_power } else { 0.0 },
        flatness,
        zcr,
        decay_ms,
        decay_slope_db_s,
        peak,
    }
}

/// Time from the loudest 5 ms block to the first block 20 dB below it
///
/// Searches up to 500 ms from `start`; a hit that never falls 20 dB reads
/// 500 ms.
pub fn measure_decay(samples: &[f32], sample_rate: u32, start: usize) -> (f32, f32) {
    let block = ((DECAY_BLOCK_MS / 1000.0) * sample_rate as f32).round().max(1.0) as usize;
    let max_blocks = (MAX_DECAY_MS / DECAY_BLOCK_MS) as usize;
    let end = (start + block * max_blocks).min(samples.len());
    if end <= start {
        return (0.0, 0.0);
    }

    let rms: Vec<f32> = samples[start..end]
        .chunks(block)
        .map(|c| (c.iter().map(|x| x * x).sum::<f32>() / c.len() as f32).sqrt())
        .collect();

    let (peak_idx, peak) = rms
        .iter()
        .copied()
        .enumerate()
        .fold((0, 0.0f32), |acc, (i, r)| if r > acc.1 { (i, r) } else { acc });
    if peak <= EPSILON {
        return (0.0, 0.0);
    }

    let floor = peak * 0.1;
    let fall = rms[peak_idx..].iter().position(|&r| r <= floor);
    match fall {
        Some(blocks) => {
            let ms = (blocks as f32 * DECAY_BLOCK_MS).min(MAX_DECAY_MS);
            let slope = if ms > 0.0 { -20.0 / (ms / 1000.0) } else { 0.0 };
            (ms, slope)
        }
        None => {
            let last = rms[rms.len() - 1].max(EPSILON);
            let span_s = ((rms.len() - 1 - peak_idx) as f32 * DECAY_BLOCK_MS / 1000.0).max(1e-3);
            (MAX_DECAY_MS, 20.0 * (last / peak).log10() / span_s)
        }
    }
}

#[cfg(test)]
pub(crate) mod synth {
    //! Synthetic drum sounds shared by the drum tests

    /// Decaying pitch-swept sine kick
    pub fn kick(sr: u32, amp: f32) -> Vec<f32> {
        let n = (0.4 * sr as f32) as usize;
        let mut phase = 0.0f32;
        (0..n)
            .map(|i| {
                let t = i as f32 / sr as f32;
                let f = 55.0 + 60.0 * (-t / 0.02).exp();
                phase += 2.0 * std::f32::consts::PI * f / sr as f32;
                amp * (-t / 0.15).exp() * phase.sin()
            })
            .collect()
    }

    /// Deterministic white noise in [-1, 1]
    pub fn noise(n: usize, seed: u32) -> Vec<f32> {
        let mut state = seed;
        (0..n)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (state >> 8) as f32 / (1u32 << 23) as f32 - 1.0
            })
            .collect()
    }

    /// One-pole high-passed noise burst with a short decay
    pub fn hihat(sr: u32, amp: f32) -> Vec<f32> {
        let n = (0.08 * sr as f32) as usize;
        let raw = noise(n, 7);
        let mut prev_in = 0.0f32;
        let mut prev_out = 0.0f32;
        raw.iter()
            .enumerate()
            .map(|(i, &x)| {
                // One-pole high-pass strips the low end
                let y = 0.95 * (prev_out + x - prev_in);
                prev_in = x;
                prev_out = y;
                let t = i as f32 / sr as f32;
                amp * (-t / 0.012).exp() * y
            })
            .collect()
    }

    /// Place sounds into a silent buffer
    pub fn place(sr: u32, seconds: f32, sounds: &[(f32, &[f32])]) -> Vec<f32> {
        let mut out = vec![0.0f32; (seconds * sr as f32) as usize];
        for &(t, sound) in sounds {
            let start = (t * sr as f32) as usize;
            for (k, &x) in sound.iter().enumerate() {
                if start + k < out.len() {
                    out[start + k] += x;
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::synth::*;
    use super::*;

    #[test]
    fn test_kick_features() {
        let sr = 44100;
        let k = kick(sr, 0.9);
        let samples = place(sr, 1.0, &[(0.2, &k)]);
        let mut scratch = StftScratch::new();
        let mut spectrum = Vec::new();
        let f = extract(&samples, sr, 0.2, &DrumClassifierConfig::default(), &mut scratch, &mut spectrum);

        assert!(f.sub > 0.5, "sub share {}", f.sub);
        assert!(f.centroid_hz < 250.0, "centroid {}", f.centroid_hz);
        assert!(f.decay_ms > 200.0, "decay {}", f.decay_ms);
        assert!(f.peak > 0.5);
    }

    #[test]
    fn test_hihat_features() {
        let sr = 44100;
        let h = hihat(sr, 0.8);
        let samples = place(sr, 1.0, &[(0.2, &h)]);
        let mut scratch = StftScratch::new();
        let mut spectrum = Vec::new();
        let f = extract(&samples, sr, 0.2, &DrumClassifierConfig::default(), &mut scratch, &mut spectrum);

        assert!(f.centroid_hz > 5000.0, "centroid {}", f.centroid_hz);
        assert!(f.decay_ms < 100.0, "decay {}", f.decay_ms);
        assert!(f.zcr > 0.3);
    }

    #[test]
    fn test_silent_window() {
        let samples = vec![0.0f32; 44100];
        let mut scratch = StftScratch::new();
        let mut spectrum = Vec::new();
        let f = extract(&samples, 44100, 0.5, &DrumClassifierConfig::default(), &mut scratch, &mut spectrum);
        assert_eq!(f.sub, 0.0);
        assert_eq!(f.decay_ms, 0.0);
    }
}
