//! Preprocessing modules
//!
//! - Channel mixdown (stereo to mono)
//! - Silence measurement

pub mod channel_mixer;
pub mod silence;
