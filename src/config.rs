//! Configuration parameters for audio analysis
//!
//! Every component reads its tunables from one of the structs below. The
//! defaults reproduce the documented behaviour; hosts may persist presets
//! through serde.

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::preprocessing::channel_mixer::ChannelMixMode;

/// Analysis configuration parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// How stereo input is folded to mono (default: Mean)
    pub mix_mode: ChannelMixMode,

    /// Onset, tempo and beat tracking
    pub rhythm: RhythmConfig,

    /// Drum hit classification rules
    pub drums: DrumClassifierConfig,

    /// Quiet-hit prediction
    pub quiet_hits: QuietHitConfig,

    /// Chromagram, key and chord detection
    pub harmony: HarmonyConfig,

    /// Mix analyser thresholds
    pub mix: MixConfig,

    /// Room acoustics
    pub room: RoomConfig,

    /// Psychoacoustic correction rules
    pub psychoacoustic: PsychoacousticConfig,
}

impl AnalysisConfig {
    /// Check parameter ranges
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidConfig` naming the first bad field.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        self.rhythm.validate()?;
        self.harmony.validate()?;
        self.mix.validate()?;
        if self.quiet_hits.energy_multiplier < 0.0 {
            return Err(AnalysisError::InvalidConfig(
                "quiet_hits.energy_multiplier must be non-negative".to_string(),
            ));
        }
        if self.room.target_rt60 <= 0.0 {
            return Err(AnalysisError::InvalidConfig(
                "room.target_rt60 must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Onset detection and tempo estimation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RhythmConfig {
    /// Target STFT window length in seconds, rounded to a power of two (default: 0.023)
    pub window_seconds: f32,

    /// Sliding window for envelope z-scoring in seconds (default: 1.0)
    pub normalisation_window_s: f32,

    /// Sliding window for the adaptive onset threshold in seconds (default: 0.5)
    pub threshold_window_s: f32,

    /// Multiplier applied to the local median (default: 1.3)
    pub threshold_multiplier: f32,

    /// Absolute threshold floor in standard deviations (default: 0.5)
    pub min_onset_strength: f32,

    /// Minimum spacing between onsets in seconds (default: 0.05)
    pub refractory_s: f32,

    /// Lowest tempo searched by autocorrelation (default: 40.0)
    pub min_bpm: f32,

    /// Highest tempo searched by autocorrelation (default: 240.0)
    pub max_bpm: f32,

    /// Centre of the log-gaussian tempo prior (default: 120.0)
    pub prior_centre_bpm: f32,

    /// Width of the tempo prior in octaves (default: 0.8)
    pub prior_sigma_octaves: f32,

    /// Estimates below this are doubled (default: 90.0)
    pub bpm_lower: f32,

    /// Estimates above this are halved (default: 180.0)
    pub bpm_upper: f32,

    /// Tempo deviation penalty for dynamic-programming beat placement (default: 100.0)
    pub dp_lambda: f32,

    /// Onsets per second below which the grid is low-confidence (default: 0.5)
    pub min_onset_density: f32,

    /// Autocorrelation peak-to-noise ratio below which the grid is low-confidence (default: 1.2)
    pub min_peak_to_noise: f32,

    /// Largest relative difference accepted between the beat-regression tempo
    /// and the autocorrelation tempo (default: 0.04)
    pub regression_tolerance: f32,
}

impl Default for RhythmConfig {
    fn default() -> Self {
        Self {
            window_seconds: 0.023,
            normalisation_window_s: 1.0,
            threshold_window_s: 0.5,
            threshold_multiplier: 1.3,
            min_onset_strength: 0.5,
            refractory_s: 0.05,
            min_bpm: 40.0,
            max_bpm: 240.0,
            prior_centre_bpm: 120.0,
            prior_sigma_octaves: 0.8,
            bpm_lower: 90.0,
            bpm_upper: 180.0,
            dp_lambda: 100.0,
            min_onset_density: 0.5,
            min_peak_to_noise: 1.2,
            regression_tolerance: 0.04,
        }
    }
}

impl RhythmConfig {
    /// Check parameter ranges
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if !(self.min_bpm > 0.0 && self.min_bpm < self.max_bpm) {
            return Err(AnalysisError::InvalidConfig(format!(
                "rhythm: min_bpm ({}) must be positive and below max_bpm ({})",
                self.min_bpm, self.max_bpm
            )));
        }
        // Doubling/halving only terminates when the band spans an octave
        if !(self.bpm_lower > 0.0 && self.bpm_upper >= 2.0 * self.bpm_lower) {
            return Err(AnalysisError::InvalidConfig(format!(
                "rhythm: bpm_upper ({}) must be at least twice bpm_lower ({})",
                self.bpm_upper, self.bpm_lower
            )));
        }
        if self.window_seconds <= 0.0 || self.normalisation_window_s <= 0.0 {
            return Err(AnalysisError::InvalidConfig(
                "rhythm: window lengths must be > 0".to_string(),
            ));
        }
        if self.prior_sigma_octaves <= 0.0 {
            return Err(AnalysisError::InvalidConfig(
                "rhythm: prior_sigma_octaves must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Rule thresholds of the drum classifier
///
/// Band fractions are shares of total power in the analysis window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrumClassifierConfig {
    /// Feature window length in milliseconds (default: 40.0)
    pub window_ms: f32,

    /// Window start before the onset time in milliseconds (default: 10.0)
    pub pre_roll_ms: f32,

    /// Kick: maximum spectral centroid (default: 250.0 Hz)
    pub kick_max_centroid_hz: f32,

    /// Snare: minimum 120–300 Hz share (default: 0.15)
    pub snare_min_low: f32,

    /// Snare: minimum 2–6 kHz share (default: 0.15)
    pub snare_min_high: f32,

    /// Snare: flatness range (default: 0.05..=0.5)
    pub snare_flatness: (f32, f32),

    /// Hi-hat: minimum centroid (default: 5000.0 Hz)
    pub hihat_min_centroid_hz: f32,

    /// Hi-hat: minimum flatness (default: 0.2)
    pub hihat_min_flatness: f32,

    /// Hi-hat: maximum decay (default: 100.0 ms)
    pub hihat_max_decay_ms: f32,

    /// Clap: minimum 1–4 kHz share (default: 0.35)
    pub clap_min_presence: f32,

    /// Clap: maximum decay (default: 60.0 ms)
    pub clap_max_decay_ms: f32,

    /// Clap: minimum flatness (default: 0.15)
    pub clap_min_flatness: f32,

    /// Tom: minimum decay (default: 200.0 ms)
    pub tom_min_decay_ms: f32,
}

impl Default for DrumClassifierConfig {
    fn default() -> Self {
        Self {
            window_ms: 40.0,
            pre_roll_ms: 10.0,
            kick_max_centroid_hz: 250.0,
            snare_min_low: 0.15,
            snare_min_high: 0.15,
            snare_flatness: (0.05, 0.5),
            hihat_min_centroid_hz: 5000.0,
            hihat_min_flatness: 0.2,
            hihat_max_decay_ms: 100.0,
            clap_min_presence: 0.35,
            clap_max_decay_ms: 60.0,
            clap_min_flatness: 0.15,
            tom_min_decay_ms: 200.0,
        }
    }
}

/// Quiet-hit predictor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuietHitConfig {
    /// Half-width of the rescan window in milliseconds (default: 40.0)
    pub search_ms: f32,

    /// Fraction of the median hit strength a candidate must reach (default: 0.3)
    pub energy_multiplier: f32,

    /// A candidate closer than this to an existing hit is dropped (default: 50.0 ms)
    pub min_separation_ms: f32,

    /// RMS block length for strength measurement (default: 5.0 ms)
    pub block_ms: f32,

    /// Bars needed before a pattern is trusted (default: 2)
    pub min_bars: usize,
}

impl Default for QuietHitConfig {
    fn default() -> Self {
        Self {
            search_ms: 40.0,
            energy_multiplier: 0.3,
            min_separation_ms: 50.0,
            block_ms: 5.0,
            min_bars: 2,
        }
    }
}

/// Chromagram, key and chord settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarmonyConfig {
    /// Target analysis window in seconds, rounded to a power of two (default: 0.186)
    pub window_seconds: f32,

    /// Hop is `window / hop_divisor` (default: 4)
    pub hop_divisor: usize,

    /// Lowest frequency folded into the chromagram (default: 20.0 Hz)
    pub chroma_min_hz: f32,

    /// Highest frequency folded into the chromagram (default: 5000.0 Hz)
    pub chroma_max_hz: f32,

    /// Also compute the per-octave chromagram (default: false)
    pub per_octave: bool,

    /// Weight of 7th tones in chord templates (default: 0.7)
    pub seventh_weight: f32,

    /// Chord smoothing state machine
    pub smoother: ChordSmootherConfig,

    /// Stem fusion weights
    pub fusion: FusionWeights,
}

impl Default for HarmonyConfig {
    fn default() -> Self {
        Self {
            window_seconds: 0.186,
            hop_divisor: 4,
            chroma_min_hz: 20.0,
            chroma_max_hz: 5000.0,
            per_octave: false,
            seventh_weight: 0.7,
            smoother: ChordSmootherConfig::default(),
            fusion: FusionWeights::default(),
        }
    }
}

impl HarmonyConfig {
    /// Check parameter ranges
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.hop_divisor == 0 {
            return Err(AnalysisError::InvalidConfig(
                "harmony: hop_divisor must be >= 1".to_string(),
            ));
        }
        if !(self.chroma_min_hz > 0.0 && self.chroma_min_hz < self.chroma_max_hz) {
            return Err(AnalysisError::InvalidConfig(format!(
                "harmony: chroma range {}..{} Hz is empty",
                self.chroma_min_hz, self.chroma_max_hz
            )));
        }
        Ok(())
    }
}

/// Chord smoother thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChordSmootherConfig {
    /// Minimum frame score to leave `Idle` (default: 0.4)
    pub enter_score: f32,

    /// Score lead a different chord needs to displace a candidate (default: 0.12)
    pub switch_margin: f32,

    /// Frames a candidate must persist (default: 3)
    pub min_frames: usize,

    /// Time a candidate must persist in seconds (default: 0.15)
    pub min_duration_s: f32,
}

impl Default for ChordSmootherConfig {
    fn default() -> Self {
        Self {
            enter_score: 0.4,
            switch_margin: 0.12,
            min_frames: 3,
            min_duration_s: 0.15,
        }
    }
}

/// Per-stem weights for chroma fusion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionWeights {
    /// Bass stem, applied to its dominant pitch class only (default: 1.3)
    pub bass: f32,
    /// Vocal stem (default: 1.0)
    pub vocals: f32,
    /// Keys / other harmonic stem (default: 1.2)
    pub other: f32,
}

impl Default for FusionWeights {
    fn default() -> Self {
        Self {
            bass: 1.3,
            vocals: 1.0,
            other: 1.2,
        }
    }
}

/// Mix analyser thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixConfig {
    /// Scan window for problems and masking in seconds (default: 1.0)
    pub window_s: f32,

    /// Problem excess for mild / moderate / severe in dB (default: 3, 5, 8)
    pub problem_db: (f32, f32, f32),

    /// Masking score for moderate / severe (default: 50, 70)
    pub masking_score: (f32, f32),

    /// Both bands must sit this far above the window median (default: 3.0 dB)
    pub masking_congestion_db: f32,

    /// Excess over the smoothed median for a resonant bin (default: 6.0 dB)
    pub resonance_db: f32,

    /// Fraction of frames a bin must be resonant in (default: 0.5)
    pub resonance_min_fraction: f32,

    /// Gaussian smoothing of the median spectrum in bins (default: 10.0)
    pub resonance_sigma_bins: f32,

    /// Scanned resonance range in Hz (default: 20..16000)
    pub resonance_range_hz: (f32, f32),

    /// Median excess bounds for mild / moderate resonances (default: 9, 12 dB)
    pub resonance_severity_db: (f32, f32),

    /// Loudness segment length in seconds (default: 1.0)
    pub loudness_segment_s: f32,

    /// Absolute loudness gate (default: -70.0 LUFS)
    pub absolute_gate_lufs: f32,

    /// Relative loudness gate (default: -10.0 LU)
    pub relative_gate_lu: f32,

    /// Reference difference that triggers a move (default: 2.0 dB)
    pub reference_threshold_db: f32,

    /// Fraction of the difference suggested as a move (default: 0.6)
    pub reference_ratio: f32,

    /// Largest suggested move (default: 3.0 dB)
    pub reference_max_move_db: f32,

    /// Below this both levels count as silence (default: -60.0 dB)
    pub reference_silence_db: f32,
}

impl Default for MixConfig {
    fn default() -> Self {
        Self {
            window_s: 1.0,
            problem_db: (3.0, 5.0, 8.0),
            masking_score: (50.0, 70.0),
            masking_congestion_db: 3.0,
            resonance_db: 6.0,
            resonance_min_fraction: 0.5,
            resonance_sigma_bins: 10.0,
            resonance_range_hz: (20.0, 16000.0),
            resonance_severity_db: (9.0, 12.0),
            loudness_segment_s: 1.0,
            absolute_gate_lufs: -70.0,
            relative_gate_lu: -10.0,
            reference_threshold_db: 2.0,
            reference_ratio: 0.6,
            reference_max_move_db: 3.0,
            reference_silence_db: -60.0,
        }
    }
}

impl MixConfig {
    /// Check parameter ranges
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.window_s <= 0.0 || self.loudness_segment_s <= 0.0 {
            return Err(AnalysisError::InvalidConfig(
                "mix: window lengths must be > 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.resonance_min_fraction) {
            return Err(AnalysisError::InvalidConfig(format!(
                "mix: resonance_min_fraction must be in [0, 1], got {}",
                self.resonance_min_fraction
            )));
        }
        Ok(())
    }
}

/// Room acoustics settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoomConfig {
    /// Speed of sound in m/s (default: 343.0)
    pub speed_of_sound: f32,

    /// Highest mode index per axis (default: 4)
    pub max_mode_order: u32,

    /// Modes above this are dropped (default: 300.0 Hz)
    pub max_mode_hz: f32,

    /// Axial modes below this are flagged (default: 100.0 Hz)
    pub problem_mode_hz: f32,

    /// Target reverberation time in seconds (default: 0.4)
    pub target_rt60: f32,

    /// Above `target × ratio` the room is too reverberant (default: 1.3)
    pub too_live_ratio: f32,

    /// Below `target × ratio` the room is too dead (default: 0.7)
    pub too_dead_ratio: f32,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            speed_of_sound: 343.0,
            max_mode_order: 4,
            max_mode_hz: 300.0,
            problem_mode_hz: 100.0,
            target_rt60: 0.4,
            too_live_ratio: 1.3,
            too_dead_ratio: 0.7,
        }
    }
}

/// Psychoacoustic correction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PsychoacousticConfig {
    /// Fraction of the deviation suggested as a move (default: 0.6)
    pub correction_ratio: f32,

    /// Largest suggested move (default: 3.0 dB)
    pub max_move_db: f32,
}

impl Default for PsychoacousticConfig {
    fn default() -> Self {
        Self {
            correction_ratio: 0.6,
            max_move_db: 3.0,
        }
    }
}
