//! Drum hit classification and editing
//!
//! - Per-onset timbral features over a short window
//! - Fixed rule hierarchy: kick, snare, hi-hat, clap, tom, else perc
//! - Grid quantiser with per-instrument swing and subdivision
//! - Bar-pattern matching against a catalogue
//! - Quiet-hit prediction from the dominant per-bar pattern

pub mod classifier;
pub mod features;
pub mod pattern;
pub mod predictor;
pub mod quantise;

use serde::{Deserialize, Serialize};

use crate::features::beat_tracking::BeatGrid;

pub use classifier::{classify, classify_samples};
pub use pattern::{default_catalogue, match_pattern, DrumPattern, PatternMatch};
pub use predictor::predict_quiet_hits;
pub use quantise::{quantise, QuantiseConfig, QuantiseSettings};

/// Drum instrument class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrumKind {
    /// Bass drum
    Kick,
    /// Snare drum
    Snare,
    /// Closed or open hi-hat
    HiHat,
    /// Hand clap
    Clap,
    /// Tom
    Tom,
    /// Anything else
    Perc,
}

impl DrumKind {
    /// All kinds in rule order
    pub const ALL: [DrumKind; 6] = [
        DrumKind::Kick,
        DrumKind::Snare,
        DrumKind::HiHat,
        DrumKind::Clap,
        DrumKind::Tom,
        DrumKind::Perc,
    ];

    /// Lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            DrumKind::Kick => "kick",
            DrumKind::Snare => "snare",
            DrumKind::HiHat => "hihat",
            DrumKind::Clap => "clap",
            DrumKind::Tom => "tom",
            DrumKind::Perc => "perc",
        }
    }
}

/// Where a hit came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HitSource {
    /// Found by onset detection
    #[default]
    Detected,
    /// Moved by the quantiser
    Quantised,
    /// Recovered by the quiet-hit predictor
    Predicted,
    /// Placed or edited by the user
    Manual,
}

/// A classified drum hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrumHit {
    /// Current time in seconds
    pub time_s: f32,

    /// Time at which the hit was found; the quantiser always starts here
    pub detected_time_s: f32,

    /// Current class
    pub kind: DrumKind,

    /// Class before a reclassification
    pub original_kind: Option<DrumKind>,

    /// Peak level relative to the loudest hit (0.0-1.0)
    pub velocity: f32,

    /// Classification confidence (0.0-1.0)
    pub confidence: f32,

    /// Bar number (1 = first bar after the first downbeat)
    pub bar: i32,

    /// Beat within the bar, 1-based (0 when no grid)
    pub beat: u32,

    /// Sixteenth within the beat
    pub subbeat: u32,

    /// Origin of the hit
    pub source: HitSource,
}

impl DrumHit {
    /// Identity within a run: detection time and class before any reclassification
    pub fn identity(&self) -> (f32, DrumKind) {
        (self.detected_time_s, self.original_kind.unwrap_or(self.kind))
    }

    /// Change the class, remembering the first one
    pub fn reclassify(&mut self, kind: DrumKind) {
        if kind != self.kind {
            if self.original_kind.is_none() {
                self.original_kind = Some(self.kind);
            }
            self.kind = kind;
        }
    }

    /// Update bar/beat/subbeat from the current time
    pub fn locate_on(&mut self, grid: &BeatGrid) {
        if let Some(pos) = grid.locate(self.time_s) {
            self.bar = pos.bar;
            self.beat = pos.beat;
            self.subbeat = pos.subbeat;
        }
    }
}

/// Fill bar/beat/subbeat of every hit from a grid
pub fn assign_positions(hits: &mut [DrumHit], grid: &BeatGrid) {
    for hit in hits.iter_mut() {
        hit.locate_on(grid);
    }
}
