//! Short-time Fourier transform
//!
//! Computes windowed magnitude spectra over a fixed frame grid. Frame `i`
//! covers samples `[i·hop, i·hop + window)`; samples past the end of the
//! buffer are zero.
//!
//! Magnitudes are amplitude-normalised by `2 / Σw`, so a full-scale sinusoid
//! centred on a bin reads close to 1.0.
//!
//! # Example
//!
//! ```
//! use stratum_studio::features::spectral::{frame, stft, WindowType};
//! use stratum_studio::AudioBuffer;
//!
//! let buffer = AudioBuffer::mono(vec![0.0f32; 44100], 44100)?;
//! let grid = frame(&buffer, 2048, 512)?;
//! let spectrogram = stft(&buffer, &grid, WindowType::Hann)?;
//! assert_eq!(spectrogram.n_bins(), 1025);
//! # Ok::<(), stratum_studio::AnalysisError>(())
//! ```

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use serde::{Deserialize, Serialize};

use crate::analysis::context::{NoSuspend, Suspend};
use crate::error::AnalysisError;
use crate::io::AudioBuffer;
use crate::preprocessing::channel_mixer::ChannelMixMode;

/// Smallest accepted window size
pub const MIN_WINDOW: usize = 256;

/// Largest accepted window size
pub const MAX_WINDOW: usize = 16384;

/// Analysis window shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WindowType {
    /// Periodic Hann window
    #[default]
    Hann,
    /// Periodic Hamming window
    Hamming,
    /// No tapering
    Rectangular,
}

impl WindowType {
    /// Window coefficients of length `n`
    pub fn coefficients(&self, n: usize) -> Vec<f32> {
        let two_pi = 2.0 * std::f32::consts::PI;
        (0..n)
            .map(|i| {
                let phase = two_pi * i as f32 / n as f32;
                match self {
                    WindowType::Hann => 0.5 - 0.5 * phase.cos(),
                    WindowType::Hamming => 0.54 - 0.46 * phase.cos(),
                    WindowType::Rectangular => 1.0,
                }
            })
            .collect()
    }
}

/// Frame layout over a buffer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameGrid {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Window length in samples (power of two)
    pub window_size: usize,
    /// Hop between frame starts in samples
    pub hop_size: usize,
    /// Number of frames
    pub n_frames: usize,
    /// Number of samples the grid was laid over
    pub n_samples: usize,
}

impl FrameGrid {
    /// Lay a grid over `n_samples` samples
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidFrame` if `window_size` is not a power of
    /// two in `[256, 16384]` or `hop_size` is outside `[1, window_size]`.
    pub fn new(
        sample_rate: u32,
        n_samples: usize,
        window_size: usize,
        hop_size: usize,
    ) -> Result<Self, AnalysisError> {
        if !window_size.is_power_of_two() || !(MIN_WINDOW..=MAX_WINDOW).contains(&window_size) {
            return Err(AnalysisError::InvalidFrame(format!(
                "Window size must be a power of two in [{}, {}], got {}",
                MIN_WINDOW, MAX_WINDOW, window_size
            )));
        }
        if hop_size == 0 || hop_size > window_size {
            return Err(AnalysisError::InvalidFrame(format!(
                "Hop size must be in [1, {}], got {}",
                window_size, hop_size
            )));
        }
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidFrame("Sample rate must be > 0".to_string()));
        }

        let n_frames = if n_samples == 0 {
            0
        } else if n_samples < window_size {
            1
        } else {
            (n_samples - window_size) / hop_size + 1
        };

        Ok(Self {
            sample_rate,
            window_size,
            hop_size,
            n_frames,
            n_samples,
        })
    }

    /// First sample of frame `i`
    pub fn frame_start(&self, i: usize) -> usize {
        i * self.hop_size
    }

    /// Centre time of frame `i` in seconds
    pub fn centre_time(&self, i: usize) -> f32 {
        (i * self.hop_size + self.window_size / 2) as f32 / self.sample_rate as f32
    }

    /// Hop duration in seconds
    pub fn hop_seconds(&self) -> f32 {
        self.hop_size as f32 / self.sample_rate as f32
    }

    /// Frames per second
    pub fn frame_rate(&self) -> f32 {
        self.sample_rate as f32 / self.hop_size as f32
    }

    /// Index of the frame whose centre is nearest to `time_s`
    pub fn frame_at_time(&self, time_s: f32) -> usize {
        if self.n_frames == 0 {
            return 0;
        }
        let offset = time_s * self.sample_rate as f32 - (self.window_size / 2) as f32;
        let i = (offset / self.hop_size as f32).round().max(0.0) as usize;
        i.min(self.n_frames - 1)
    }

    /// Number of frequency bins per frame
    pub fn n_bins(&self) -> usize {
        self.window_size / 2 + 1
    }

    /// Frequency resolution in Hz
    pub fn bin_hz(&self) -> f32 {
        self.sample_rate as f32 / self.window_size as f32
    }
}

/// Build a frame grid over a buffer
///
/// # Errors
///
/// See [`FrameGrid::new`].
pub fn frame(
    buffer: &AudioBuffer,
    window_size: usize,
    hop_size: usize,
) -> Result<FrameGrid, AnalysisError> {
    FrameGrid::new(buffer.sample_rate(), buffer.len(), window_size, hop_size)
}

/// Magnitude spectrogram
///
/// Stored as one contiguous `n_frames × n_bins` matrix. Bin 0 is DC and bin
/// frequencies increase monotonically.
#[derive(Debug, Clone)]
pub struct Spectrogram {
    grid: FrameGrid,
    window: WindowType,
    n_bins: usize,
    magnitudes: Vec<f32>,
}

impl Spectrogram {
    /// Build a spectrogram from a flat magnitude matrix
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if the matrix size does not match
    /// the grid.
    pub fn from_magnitudes(
        grid: FrameGrid,
        window: WindowType,
        magnitudes: Vec<f32>,
    ) -> Result<Self, AnalysisError> {
        let n_bins = grid.n_bins();
        if magnitudes.len() != grid.n_frames * n_bins {
            return Err(AnalysisError::InvalidInput(format!(
                "Magnitude matrix has {} values, expected {} frames × {} bins",
                magnitudes.len(),
                grid.n_frames,
                n_bins
            )));
        }
        Ok(Self {
            grid,
            window,
            n_bins,
            magnitudes,
        })
    }

    /// Frame grid
    pub fn grid(&self) -> &FrameGrid {
        &self.grid
    }

    /// Window used
    pub fn window(&self) -> WindowType {
        self.window
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.grid.sample_rate
    }

    /// Number of frames
    pub fn n_frames(&self) -> usize {
        self.grid.n_frames
    }

    /// Number of bins per frame (`window/2 + 1`)
    pub fn n_bins(&self) -> usize {
        self.n_bins
    }

    /// Magnitudes of frame `i`
    pub fn frame(&self, i: usize) -> &[f32] {
        &self.magnitudes[i * self.n_bins..(i + 1) * self.n_bins]
    }

    /// Iterate over frames
    pub fn frames(&self) -> impl Iterator<Item = &[f32]> {
        self.magnitudes.chunks_exact(self.n_bins.max(1))
    }

    /// Frequency of bin `k` in Hz
    pub fn bin_frequency(&self, k: usize) -> f32 {
        k as f32 * self.grid.bin_hz()
    }

    /// Bin nearest to `hz`
    pub fn bin_for_frequency(&self, hz: f32) -> usize {
        ((hz / self.grid.bin_hz()).round().max(0.0) as usize).min(self.n_bins - 1)
    }

    /// Half-open bin range covering `[lo_hz, hi_hz)`
    ///
    /// Falls back to the single nearest bin when the range is narrower than
    /// one bin.
    pub fn bin_range(&self, lo_hz: f32, hi_hz: f32) -> std::ops::Range<usize> {
        let df = self.grid.bin_hz();
        let start = ((lo_hz / df).ceil().max(0.0) as usize).min(self.n_bins);
        let end = ((hi_hz / df).ceil().max(0.0) as usize).min(self.n_bins);
        if end > start {
            start..end
        } else {
            let k = self.bin_for_frequency(0.5 * (lo_hz + hi_hz));
            k..k + 1
        }
    }

    /// Centre time of frame `i` in seconds
    pub fn frame_time(&self, i: usize) -> f32 {
        self.grid.centre_time(i)
    }
}

/// Reusable STFT working memory
///
/// Holds the FFT planner, the complex frame buffer, FFT scratch and the
/// cached window so that a run allocates a bounded number of arrays no matter
/// how long the buffer is.
pub struct StftScratch {
    planner: FftPlanner<f32>,
    buffer: Vec<Complex<f32>>,
    fft_scratch: Vec<Complex<f32>>,
    window: Vec<f32>,
    window_key: Option<(usize, WindowType)>,
}

impl Default for StftScratch {
    fn default() -> Self {
        Self::new()
    }
}

impl StftScratch {
    /// Create empty scratch space
    pub fn new() -> Self {
        Self {
            planner: FftPlanner::new(),
            buffer: Vec::new(),
            fft_scratch: Vec::new(),
            window: Vec::new(),
            window_key: None,
        }
    }

    fn prepare(&mut self, size: usize, window: WindowType) -> Arc<dyn Fft<f32>> {
        let fft = self.planner.plan_fft_forward(size);
        if self.window_key != Some((size, window)) {
            self.window = window.coefficients(size);
            self.window_key = Some((size, window));
        }
        self.buffer.resize(size, Complex::new(0.0, 0.0));
        let scratch_len = fft.get_inplace_scratch_len();
        if self.fft_scratch.len() < scratch_len {
            self.fft_scratch.resize(scratch_len, Complex::new(0.0, 0.0));
        }
        fft
    }

    /// Magnitude spectrum of one frame of samples
    ///
    /// `samples` shorter than `size` are zero-padded; `out` receives
    /// `size/2 + 1` normalised magnitudes.
    pub fn magnitude_frame(
        &mut self,
        samples: &[f32],
        size: usize,
        window: WindowType,
        out: &mut [f32],
    ) {
        let fft = self.prepare(size, window);
        let norm = window_norm(&self.window);

        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let x = samples.get(i).copied().unwrap_or(0.0);
            *slot = Complex::new(x * self.window[i], 0.0);
        }
        let scratch_len = fft.get_inplace_scratch_len();
        fft.process_with_scratch(&mut self.buffer, &mut self.fft_scratch[..scratch_len]);

        for (k, o) in out.iter_mut().enumerate().take(size / 2 + 1) {
            let m = self.buffer[k].norm() * norm;
            *o = if m.is_finite() { m } else { 0.0 };
        }
    }
}

fn window_norm(window: &[f32]) -> f32 {
    let sum: f32 = window.iter().sum();
    if sum > 0.0 {
        2.0 / sum
    } else {
        0.0
    }
}

/// Compute the STFT of a buffer's mean channel over a grid
///
/// # Errors
///
/// Returns `AnalysisError::InvalidFrame` if the grid was built for a
/// different sample rate.
pub fn stft(
    buffer: &AudioBuffer,
    grid: &FrameGrid,
    window: WindowType,
) -> Result<Spectrogram, AnalysisError> {
    if grid.sample_rate != buffer.sample_rate() {
        return Err(AnalysisError::InvalidFrame(format!(
            "Grid sample rate {} does not match buffer sample rate {}",
            grid.sample_rate,
            buffer.sample_rate()
        )));
    }
    let mono = buffer.mixdown(ChannelMixMode::Mean);
    let mut scratch = StftScratch::new();
    stft_samples(&mono, grid, window, &mut scratch, &mut NoSuspend)
}

/// Compute the STFT of mono samples with caller-owned scratch
///
/// Passes a suspension point after every frame.
pub fn stft_samples(
    samples: &[f32],
    grid: &FrameGrid,
    window: WindowType,
    scratch: &mut StftScratch,
    suspend: &mut dyn Suspend,
) -> Result<Spectrogram, AnalysisError> {
    log::debug!(
        "Computing STFT: {} samples, window={}, hop={}, {} frames ({:?})",
        samples.len(),
        grid.window_size,
        grid.hop_size,
        grid.n_frames,
        window
    );

    let n_bins = grid.n_bins();
    let mut magnitudes = vec![0.0f32; grid.n_frames * n_bins];

    for (i, out) in magnitudes.chunks_exact_mut(n_bins.max(1)).enumerate() {
        suspend.checkpoint()?;
        let start = grid.frame_start(i).min(samples.len());
        let end = (start + grid.window_size).min(samples.len());
        scratch.magnitude_frame(&samples[start..end], grid.window_size, window, out);
    }

    Spectrogram::from_magnitudes(*grid, window, magnitudes)
}
