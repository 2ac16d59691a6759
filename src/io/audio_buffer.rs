//! Immutable decoded audio buffer

use crate::error::AnalysisError;
use crate::preprocessing::channel_mixer::{mix_to_mono, ChannelMixMode};

/// Lowest supported sample rate in Hz
pub const MIN_SAMPLE_RATE: u32 = 8_000;

/// Highest supported sample rate in Hz
pub const MAX_SAMPLE_RATE: u32 = 192_000;

/// Decoded mono or stereo audio
///
/// Channels are stored as separate contiguous `f32` arrays in `[-1.0, 1.0]`.
/// All channels have the same length; `len() / sample_rate` is the duration.
///
/// # Example
///
/// ```
/// use stratum_studio::AudioBuffer;
///
/// let buffer = AudioBuffer::mono(vec![0.0f32; 44100], 44100)?;
/// assert_eq!(buffer.duration_seconds(), 1.0);
/// # Ok::<(), stratum_studio::AnalysisError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl AudioBuffer {
    /// Create a buffer from per-channel sample arrays
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if the channel count is not 1 or 2
    /// or the channels differ in length.
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Result<Self, AnalysisError> {
        if channels.is_empty() || channels.len() > 2 {
            return Err(AnalysisError::InvalidInput(format!(
                "Channel count must be 1 or 2, got {}",
                channels.len()
            )));
        }

        let len = channels[0].len();
        if channels.iter().any(|c| c.len() != len) {
            return Err(AnalysisError::InvalidInput(
                "All channels must have equal length".to_string(),
            ));
        }

        Ok(Self {
            sample_rate,
            channels,
        })
    }

    /// Create a mono buffer
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self, AnalysisError> {
        Self::new(sample_rate, vec![samples])
    }

    /// Create a stereo buffer
    pub fn stereo(left: Vec<f32>, right: Vec<f32>, sample_rate: u32) -> Result<Self, AnalysisError> {
        Self::new(sample_rate, vec![left, right])
    }

    /// Check that the buffer can be analysed
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` for an empty buffer or a sample
    /// rate outside `[8000, 192000]` Hz.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.is_empty() {
            return Err(AnalysisError::InvalidInput("Empty audio buffer".to_string()));
        }
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            return Err(AnalysisError::InvalidInput(format!(
                "Unsupported sample rate: {} Hz (supported {}-{} Hz)",
                self.sample_rate, MIN_SAMPLE_RATE, MAX_SAMPLE_RATE
            )));
        }
        Ok(())
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of channels (1 or 2)
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Samples per channel
    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    /// True if the buffer holds no samples
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Duration in seconds
    pub fn duration_seconds(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.len() as f32 / self.sample_rate as f32
    }

    /// Borrow one channel
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(|c| c.as_slice())
    }

    /// Borrow all channels
    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Mix down to a single analysis channel
    ///
    /// Always returns a fresh vector; the buffer itself is never modified.
    /// Non-finite samples are replaced by silence.
    pub fn mixdown(&self, mode: ChannelMixMode) -> Vec<f32> {
        mix_to_mono(&self.channels, mode)
    }
}
