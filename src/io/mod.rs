//! Audio input modules
//!
//! The engine consumes already-decoded PCM; this module holds the immutable
//! buffer type every component reads from.

pub mod audio_buffer;

pub use audio_buffer::AudioBuffer;
