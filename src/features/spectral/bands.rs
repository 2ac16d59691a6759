//! Seven-band frequency layout
//!
//! The band ranges are a stable contract: every component that talks about
//! frequency regions (mix analyser, reference comparator, psychoacoustic
//! weighter) uses these seven bands.

use serde::{Deserialize, Serialize};

use super::scale::amplitude_to_db;
use super::stft::{FrameGrid, Spectrogram};

/// Number of bands
pub const N_BANDS: usize = 7;

/// One of the seven analysis bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Band {
    /// 20–60 Hz
    Sub,
    /// 60–120 Hz
    Bass,
    /// 120–250 Hz
    LowMid,
    /// 250–1000 Hz
    Mid,
    /// 1–4 kHz
    Presence,
    /// 4–12 kHz
    Brilliance,
    /// 12–18 kHz
    Air,
}

impl Band {
    /// All bands, low to high
    pub const ALL: [Band; N_BANDS] = [
        Band::Sub,
        Band::Bass,
        Band::LowMid,
        Band::Mid,
        Band::Presence,
        Band::Brilliance,
        Band::Air,
    ];

    /// Frequency range `(lo, hi)` in Hz
    pub fn range_hz(&self) -> (f32, f32) {
        match self {
            Band::Sub => (20.0, 60.0),
            Band::Bass => (60.0, 120.0),
            Band::LowMid => (120.0, 250.0),
            Band::Mid => (250.0, 1000.0),
            Band::Presence => (1000.0, 4000.0),
            Band::Brilliance => (4000.0, 12000.0),
            Band::Air => (12000.0, 18000.0),
        }
    }

    /// Wire name (`"low-mid"` etc.)
    pub fn name(&self) -> &'static str {
        match self {
            Band::Sub => "sub",
            Band::Bass => "bass",
            Band::LowMid => "low-mid",
            Band::Mid => "mid",
            Band::Presence => "presence",
            Band::Brilliance => "brilliance",
            Band::Air => "air",
        }
    }

    /// Position in [`Band::ALL`]
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Geometric centre in Hz
    pub fn centre_hz(&self) -> f32 {
        let (lo, hi) = self.range_hz();
        (lo * hi).sqrt()
    }

    /// Band containing `hz`, if any
    pub fn containing(hz: f32) -> Option<Band> {
        Band::ALL.iter().copied().find(|b| {
            let (lo, hi) = b.range_hz();
            hz >= lo && hz < hi
        })
    }
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Band-averaged spectrogram
///
/// Each entry is the mean linear magnitude of the bins whose frequency lies
/// in the band's `[lo, hi)` range.
#[derive(Debug, Clone)]
pub struct BandSpectrogram {
    /// Frame grid shared with the source spectrogram
    pub grid: FrameGrid,
    /// Per-frame band magnitudes, indexed by [`Band::index`]
    pub energies: Vec<[f32; N_BANDS]>,
}

impl BandSpectrogram {
    /// Number of frames
    pub fn n_frames(&self) -> usize {
        self.energies.len()
    }

    /// Mean magnitude per band over frames `[start, end)`
    pub fn mean_over(&self, start: usize, end: usize) -> [f32; N_BANDS] {
        let end = end.min(self.energies.len());
        let mut out = [0.0f32; N_BANDS];
        if end <= start {
            return out;
        }
        for frame in &self.energies[start..end] {
            for (o, &e) in out.iter_mut().zip(frame.iter()) {
                *o += e;
            }
        }
        let n = (end - start) as f32;
        out.iter_mut().for_each(|o| *o /= n);
        out
    }

    /// Mean band levels over the whole buffer in dB
    pub fn mean_db(&self) -> [f32; N_BANDS] {
        self.mean_over(0, self.energies.len()).map(amplitude_to_db)
    }
}

/// Average a spectrogram into bands
///
/// Bands narrower than one bin read the nearest bin.
pub fn to_bands(spectrogram: &Spectrogram, bands: &[Band; N_BANDS]) -> BandSpectrogram {
    let ranges: Vec<std::ops::Range<usize>> = bands
        .iter()
        .map(|b| {
            let (lo, hi) = b.range_hz();
            spectrogram.bin_range(lo, hi)
        })
        .collect();

    let energies = spectrogram
        .frames()
        .map(|frame| {
            let mut row = [0.0f32; N_BANDS];
            for (slot, range) in row.iter_mut().zip(ranges.iter()) {
                let bins = &frame[range.clone()];
                if !bins.is_empty() {
                    *slot = bins.iter().sum::<f32>() / bins.len() as f32;
                }
            }
            row
        })
        .collect();

    BandSpectrogram {
        grid: *spectrogram.grid(),
        energies,
    }
}
