//! Chord detection
//!
//! Turns a chromagram into a stable, non-overlapping sequence of chord
//! segments:
//! - Template scoring of every frame (8 qualities × 12 roots)
//! - Smoothing state machine (`Idle` → `Candidate` → `Stable`)
//! - Optional snapping of segment boundaries to a beat grid
//! - Optional weighted fusion of stem chromagrams

pub mod align;
pub mod fusion;
pub mod smoother;
pub mod templates;

pub use align::align_to_grid;
pub use fusion::{attach_bass_notes, fuse_chroma, StemChroma, StemKind};
pub use smoother::{ChordSmoother, SmootherState};
pub use templates::{ChordFrame, ChordTemplates};

use serde::{Deserialize, Serialize};

use crate::analysis::context::Suspend;
use crate::config::HarmonyConfig;
use crate::error::AnalysisError;
use crate::features::chroma::{pitch_class_name, Chroma};
use crate::features::spectral::stft::FrameGrid;

/// Chord quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChordQuality {
    /// Major triad
    Maj,
    /// Minor triad
    Min,
    /// Major seventh
    Maj7,
    /// Minor seventh
    Min7,
    /// Dominant seventh
    Dom7,
    /// Diminished triad
    Dim,
    /// Augmented triad
    Aug,
    /// Half-diminished seventh
    Hdim7,
}

impl ChordQuality {
    /// All qualities in template order
    pub const ALL: [ChordQuality; 8] = [
        ChordQuality::Maj,
        ChordQuality::Min,
        ChordQuality::Maj7,
        ChordQuality::Min7,
        ChordQuality::Dom7,
        ChordQuality::Dim,
        ChordQuality::Aug,
        ChordQuality::Hdim7,
    ];

    /// Symbol suffix
    pub fn name(&self) -> &'static str {
        match self {
            ChordQuality::Maj => "maj",
            ChordQuality::Min => "min",
            ChordQuality::Maj7 => "maj7",
            ChordQuality::Min7 => "min7",
            ChordQuality::Dom7 => "dom7",
            ChordQuality::Dim => "dim",
            ChordQuality::Aug => "aug",
            ChordQuality::Hdim7 => "hdim7",
        }
    }

    /// Triad underlying a 7th chord; triads map to themselves
    pub fn triad(&self) -> ChordQuality {
        match self {
            ChordQuality::Maj7 | ChordQuality::Dom7 => ChordQuality::Maj,
            ChordQuality::Min7 => ChordQuality::Min,
            ChordQuality::Hdim7 => ChordQuality::Dim,
            triad => *triad,
        }
    }

    /// Chord tones as (semitones above root, is 7th)
    pub fn intervals(&self) -> &'static [(u8, bool)] {
        match self {
            ChordQuality::Maj => &[(0, false), (4, false), (7, false)],
            ChordQuality::Min => &[(0, false), (3, false), (7, false)],
            ChordQuality::Maj7 => &[(0, false), (4, false), (7, false), (11, true)],
            ChordQuality::Min7 => &[(0, false), (3, false), (7, false), (10, true)],
            ChordQuality::Dom7 => &[(0, false), (4, false), (7, false), (10, true)],
            ChordQuality::Dim => &[(0, false), (3, false), (6, false)],
            ChordQuality::Aug => &[(0, false), (4, false), (8, false)],
            ChordQuality::Hdim7 => &[(0, false), (3, false), (6, false), (10, true)],
        }
    }
}

/// Root and quality of a chord
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChordLabel {
    /// Root pitch class (0 = C … 11 = B)
    pub root: u8,
    /// Chord quality
    pub quality: ChordQuality,
}

impl ChordLabel {
    /// Create a label; the root wraps modulo 12
    pub fn new(root: u8, quality: ChordQuality) -> Self {
        Self {
            root: root % 12,
            quality,
        }
    }

    /// Symbol such as `"Cmaj"` or `"F#min7"`
    pub fn symbol(&self) -> String {
        format!("{}{}", pitch_class_name(self.root as usize), self.quality.name())
    }
}

impl std::fmt::Display for ChordLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.symbol())
    }
}

/// A stable chord over a time span
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChordSegment {
    /// Root pitch class
    pub root: u8,

    /// Chord quality
    pub quality: ChordQuality,

    /// Mean template score of the chord over its frames (0.0-1.0)
    pub confidence: f32,

    /// Mean lead of the chord over the runner-up template
    pub margin: f32,

    /// Segment start in seconds
    pub start_s: f32,

    /// Segment end in seconds (exclusive, > `start_s`)
    pub end_s: f32,

    /// Bass pitch class when a bass stem was analysed
    pub bass_pitch_class: Option<u8>,
}

impl ChordSegment {
    /// Root and quality
    pub fn label(&self) -> ChordLabel {
        ChordLabel::new(self.root, self.quality)
    }

    /// Duration in seconds
    pub fn duration(&self) -> f32 {
        self.end_s - self.start_s
    }

    /// Symbol with slash bass when the bass differs from the root
    ///
    /// # Example
    ///
    /// ```
    /// use stratum_studio::features::chords::{ChordQuality, ChordSegment};
    ///
    /// let mut seg = ChordSegment {
    ///     root: 9,
    ///     quality: ChordQuality::Min7,
    ///     confidence: 0.9,
    ///     margin: 0.05,
    ///     start_s: 0.0,
    ///     end_s: 2.0,
    ///     bass_pitch_class: None,
    /// };
    /// assert_eq!(seg.symbol(), "Amin7");
    /// seg.bass_pitch_class = Some(4);
    /// assert_eq!(seg.symbol(), "Amin7/E");
    /// seg.bass_pitch_class = Some(9);
    /// assert_eq!(seg.symbol(), "Amin7");
    /// ```
    pub fn symbol(&self) -> String {
        let base = self.label().symbol();
        match self.bass_pitch_class {
            Some(bass) if bass % 12 != self.root => {
                format!("{}/{}", base, pitch_class_name(bass as usize))
            }
            _ => base,
        }
    }
}

/// Score every frame and smooth the result into chord segments
///
/// `frames` are chroma vectors on `grid`. The terminal segment closes at the
/// centre time of the last frame. Passes a suspension point after every
/// frame.
pub fn detect_chords(
    frames: &[Chroma],
    grid: &FrameGrid,
    config: &HarmonyConfig,
    suspend: &mut dyn Suspend,
) -> Result<Vec<ChordSegment>, AnalysisError> {
    log::debug!(
        "Detecting chords: {} frames, hop {:.1} ms",
        frames.len(),
        grid.hop_seconds() * 1000.0
    );

    let templates = ChordTemplates::new(config.seventh_weight);
    let mut smoother = ChordSmoother::new(config.smoother.clone(), grid.hop_seconds());

    for (i, chroma) in frames.iter().enumerate() {
        suspend.checkpoint()?;
        let frame = templates.score_frame(chroma);
        smoother.push(grid.centre_time(i), &frame);
    }

    let end_s = if frames.is_empty() {
        0.0
    } else {
        grid.centre_time(frames.len() - 1)
    };
    let segments = smoother.finish(end_s);

    log::debug!("Detected {} chord segments", segments.len());
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::context::NoSuspend;

    fn triad(root: usize, third: usize) -> Chroma {
        let mut c = [0.0f32; 12];
        c[root % 12] = 1.0;
        c[(root + third) % 12] = 0.9;
        c[(root + 7) % 12] = 0.9;
        c
    }

    #[test]
    fn test_symbol() {
        assert_eq!(ChordLabel::new(0, ChordQuality::Maj).symbol(), "Cmaj");
        assert_eq!(ChordLabel::new(13, ChordQuality::Dim).symbol(), "C#dim");
    }

    #[test]
    fn test_quality_serde_names() {
        let json = serde_json::to_string(&ChordQuality::Hdim7).unwrap();
        assert_eq!(json, "\"hdim7\"");
    }

    #[test]
    fn test_detect_two_chords() {
        let grid = FrameGrid::new(44100, 44100 * 10, 8192, 2048).unwrap();
        let n = grid.n_frames;
        let frames: Vec<Chroma> = (0..n)
            .map(|i| if i < n / 2 { triad(0, 4) } else { triad(9, 3) })
            .collect();
        let segments =
            detect_chords(&frames, &grid, &HarmonyConfig::default(), &mut NoSuspend).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].label(), ChordLabel::new(0, ChordQuality::Maj));
        assert_eq!(segments[1].label(), ChordLabel::new(9, ChordQuality::Min));
        assert_eq!(segments[0].start_s, grid.centre_time(0));
        assert_eq!(segments[0].end_s, segments[1].start_s);
        assert_eq!(segments[1].end_s, grid.centre_time(n - 1));
        for s in &segments {
            assert!(s.end_s > s.start_s);
            assert!(s.confidence > 0.9);
        }
    }

    #[test]
    fn test_silence_has_no_chords() {
        let grid = FrameGrid::new(44100, 44100 * 2, 8192, 2048).unwrap();
        let frames = vec![[0.0f32; 12]; grid.n_frames];
        let segments =
            detect_chords(&frames, &grid, &HarmonyConfig::default(), &mut NoSuspend).unwrap();
        assert!(segments.is_empty());
    }
}
