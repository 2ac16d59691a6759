//! Live chord meter
//!
//! Frame-at-a-time chord readout for meter-style UI feedback. The meter
//! owns its scratch space, bin→pitch-class table and smoother; each pushed
//! frame advances its clock by one harmony hop. Results are indicative
//! only; the offline path is authoritative.

use serde::{Deserialize, Serialize};

use crate::config::HarmonyConfig;
use crate::error::AnalysisError;
use crate::features::chords::{ChordFrame, ChordLabel, ChordSmoother, ChordTemplates, SmootherState};
use crate::features::chroma::{frame_chroma, harmony_grid, Chroma, ChromaMap};
use crate::features::spectral::{FrameGrid, StftScratch, WindowType};

/// One meter reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveReading {
    /// Centre time of the frame since the meter started (seconds)
    pub time_s: f32,
    /// Chroma of the frame (max = 1, zero when silent)
    pub chroma: Chroma,
    /// Best template for this frame alone
    pub frame: ChordFrame,
    /// Smoothed chord, if one is established
    pub chord: Option<ChordLabel>,
    /// Smoother state after this frame
    pub state: SmootherState,
}

/// Frame-by-frame chord meter
///
/// # Example
///
/// ```
/// use stratum_studio::config::HarmonyConfig;
/// use stratum_studio::LiveChordMeter;
///
/// let mut meter = LiveChordMeter::new(44100, &HarmonyConfig::default())?;
/// let frame = vec![0.0f32; meter.window_size()];
/// let reading = meter.push_samples(&frame)?;
/// assert!(reading.chord.is_none());
/// # Ok::<(), stratum_studio::AnalysisError>(())
/// ```
pub struct LiveChordMeter {
    grid: FrameGrid,
    scratch: StftScratch,
    spectrum: Vec<f32>,
    map: ChromaMap,
    templates: ChordTemplates,
    smoother: ChordSmoother,
    frames_seen: usize,
}

impl LiveChordMeter {
    /// Create a meter for `sample_rate` with the harmony window and hop
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidConfig` for an invalid harmony config.
    pub fn new(sample_rate: u32, config: &HarmonyConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        let window = harmony_grid(sample_rate, 0, config)?.window_size;
        let grid = harmony_grid(sample_rate, window, config)?;
        let n_bins = grid.n_bins();
        let map = ChromaMap::new(n_bins, grid.bin_hz(), config.chroma_min_hz, config.chroma_max_hz);
        log::debug!(
            "Live chord meter: window {} hop {} at {} Hz, {} chroma bins",
            grid.window_size,
            grid.hop_size,
            sample_rate,
            map.len()
        );
        let smoother = ChordSmoother::new(config.smoother.clone(), grid.hop_seconds());
        Ok(Self {
            grid,
            scratch: StftScratch::new(),
            spectrum: vec![0.0; n_bins],
            map,
            templates: ChordTemplates::new(config.seventh_weight),
            smoother,
            frames_seen: 0,
        })
    }

    /// Samples expected by `push_samples`
    pub fn window_size(&self) -> usize {
        self.grid.window_size
    }

    /// Bins expected by `push_spectrum`
    pub fn n_bins(&self) -> usize {
        self.spectrum.len()
    }

    /// Push one time-domain frame of exactly `window_size` samples
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidFrame` for a frame of the wrong length.
    pub fn push_samples(&mut self, frame: &[f32]) -> Result<LiveReading, AnalysisError> {
        if frame.len() != self.grid.window_size {
            return Err(AnalysisError::InvalidFrame(format!(
                "Live frame has {} samples, expected {}",
                frame.len(),
                self.grid.window_size
            )));
        }
        let mut spectrum = std::mem::take(&mut self.spectrum);
        self.scratch
            .magnitude_frame(frame, self.grid.window_size, WindowType::Hann, &mut spectrum);
        let reading = self.read(&spectrum);
        self.spectrum = spectrum;
        Ok(reading)
    }

    /// Push one magnitude spectrum of exactly `n_bins` bins
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidFrame` for a spectrum of the wrong
    /// length.
    pub fn push_spectrum(&mut self, magnitudes: &[f32]) -> Result<LiveReading, AnalysisError> {
        if magnitudes.len() != self.spectrum.len() {
            return Err(AnalysisError::InvalidFrame(format!(
                "Live spectrum has {} bins, expected {}",
                magnitudes.len(),
                self.spectrum.len()
            )));
        }
        Ok(self.read(magnitudes))
    }

    /// Forget the smoother state and restart the clock
    pub fn reset(&mut self) {
        self.smoother.reset();
        self.frames_seen = 0;
    }

    fn read(&mut self, magnitudes: &[f32]) -> LiveReading {
        let time_s = (self.frames_seen * self.grid.hop_size + self.grid.window_size / 2) as f32
            / self.grid.sample_rate as f32;
        self.frames_seen += 1;

        let chroma = frame_chroma(magnitudes, &self.map);
        let frame = self.templates.score_frame(&chroma);
        self.smoother.push(time_s, &frame);

        LiveReading {
            time_s,
            chroma,
            frame,
            chord: self.smoother.current(),
            state: self.smoother.state(),
        }
    }
}
