//! Analysis result types

use serde::{Deserialize, Serialize};

use super::metadata::AnalysisMetadata;
use crate::features::chords::ChordSegment;
use crate::features::chroma::Chromagram;
use crate::features::drums::{DrumHit, PatternMatch};
use crate::features::key::KeyDetectionResult;
use crate::features::mix::MixReport;
use crate::features::onset::Onset;
use crate::features::psychoacoustic::PsychoacousticReport;
use crate::features::room::RoomReport;

pub use crate::features::beat_tracking::BeatGrid;
pub use crate::features::key::Key;

/// Non-fatal conditions attached to a degraded component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisFlag {
    /// Buffer shorter than one second
    ShortBuffer,
    /// Onset density below the tracker's floor
    SparseOnsets,
    /// Autocorrelation peak too weak for a reliable tempo
    WeakPeriodicity,
    /// Low key clarity (atonal/ambiguous)
    WeakTonality,
    /// No stable chord was found
    NoChords,
    /// Stems were supplied but none carried harmonic signal
    SilentStems,
}

/// Outcome of one component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "flags", rename_all = "snake_case")]
pub enum ComponentStatus {
    /// Ran on adequate input
    Ok,
    /// Ran, but the result carries low confidence
    Degraded(Vec<AnalysisFlag>),
    /// Not requested, or its input was missing
    Skipped,
    /// Hit an internal error; no result
    Failed,
}

impl ComponentStatus {
    /// Ok, or Degraded with the given flags
    pub fn from_flags(flags: Vec<AnalysisFlag>) -> Self {
        if flags.is_empty() {
            ComponentStatus::Ok
        } else {
            ComponentStatus::Degraded(flags)
        }
    }

    /// True for `Ok`
    pub fn is_ok(&self) -> bool {
        matches!(self, ComponentStatus::Ok)
    }

    /// True for `Failed`
    pub fn is_failed(&self) -> bool {
        matches!(self, ComponentStatus::Failed)
    }

    /// Flags of a degraded component
    pub fn flags(&self) -> &[AnalysisFlag] {
        match self {
            ComponentStatus::Degraded(flags) => flags,
            _ => &[],
        }
    }
}

/// Status of every component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentStatuses {
    /// Onsets, beats and drums
    pub rhythm: ComponentStatus,
    /// Chroma, key and chords
    pub harmony: ComponentStatus,
    /// Mix analysis
    pub mix: ComponentStatus,
    /// Room acoustics
    pub room: ComponentStatus,
    /// Psychoacoustic weighting
    pub psychoacoustic: ComponentStatus,
}

impl Default for ComponentStatuses {
    fn default() -> Self {
        Self {
            rhythm: ComponentStatus::Skipped,
            harmony: ComponentStatus::Skipped,
            mix: ComponentStatus::Skipped,
            room: ComponentStatus::Skipped,
            psychoacoustic: ComponentStatus::Skipped,
        }
    }
}

impl ComponentStatuses {
    /// All statuses with their component names
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ComponentStatus)> {
        [
            ("rhythm", &self.rhythm),
            ("harmony", &self.harmony),
            ("mix", &self.mix),
            ("room", &self.room),
            ("psychoacoustic", &self.psychoacoustic),
        ]
        .into_iter()
    }

    /// True if any component failed
    pub fn any_failed(&self) -> bool {
        self.iter().any(|(_, s)| s.is_failed())
    }
}

/// Rhythm analysis output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RhythmResult {
    /// Beat grid
    pub beat_grid: BeatGrid,

    /// Detected onsets
    pub onsets: Vec<Onset>,

    /// Classified drum hits, including predicted quiet hits
    pub hits: Vec<DrumHit>,

    /// Best catalogue pattern
    pub pattern: Option<PatternMatch>,

    /// Onsets per second
    pub onset_density: f32,
}

/// Harmony analysis output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarmonyResult {
    /// Chromagram of the mix
    pub chromagram: Chromagram,

    /// Key detection details
    pub key_detection: KeyDetectionResult,

    /// Key display name, e.g. `"C major"`
    pub key: String,

    /// Chord segments, time ordered and non-overlapping
    pub chords: Vec<ChordSegment>,

    /// Chords were detected on fused stem chroma
    pub fused: bool,

    /// Overall harmony confidence (0.0-1.0)
    pub confidence: f32,
}

impl HarmonyResult {
    /// Fraction of `duration_s` covered by chord segments
    pub fn chord_coverage(&self, duration_s: f32) -> f32 {
        if duration_s <= 0.0 {
            return 0.0;
        }
        let covered: f32 = self.chords.iter().map(|c| c.duration()).sum();
        (covered / duration_s).clamp(0.0, 1.0)
    }
}

/// Complete analysis result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// True when no component failed
    pub ok: bool,

    /// Per-component status
    pub status: ComponentStatuses,

    /// Rhythm output
    pub rhythm: Option<RhythmResult>,

    /// Harmony output
    pub harmony: Option<HarmonyResult>,

    /// Mix report
    pub mix: Option<MixReport>,

    /// Room report
    pub room: Option<RoomReport>,

    /// Psychoacoustic report
    pub psychoacoustic: Option<PsychoacousticReport>,

    /// Analysis metadata
    pub metadata: AnalysisMetadata,
}

impl AnalysisResult {
    /// Tempo, if rhythm ran
    pub fn bpm(&self) -> Option<f32> {
        self.rhythm.as_ref().map(|r| r.beat_grid.bpm)
    }

    /// Key display name, if harmony ran
    pub fn key_name(&self) -> Option<&str> {
        self.harmony.as_ref().map(|h| h.key.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_flags() {
        assert_eq!(ComponentStatus::from_flags(vec![]), ComponentStatus::Ok);
        let degraded = ComponentStatus::from_flags(vec![AnalysisFlag::ShortBuffer]);
        assert!(!degraded.is_ok());
        assert_eq!(degraded.flags(), &[AnalysisFlag::ShortBuffer]);
    }

    #[test]
    fn test_statuses_default_skipped() {
        let statuses = ComponentStatuses::default();
        assert!(statuses.iter().all(|(_, s)| *s == ComponentStatus::Skipped));
        assert!(!statuses.any_failed());
    }

    #[test]
    fn test_chord_coverage() {
        use crate::features::chords::ChordQuality;
        use crate::features::chroma::Chromagram;
        use crate::features::key::{detect_key, KeyTemplates};
        use crate::features::spectral::FrameGrid;

        let mut chroma = [0.0f32; 12];
        chroma[0] = 1.0;
        chroma[4] = 1.0;
        chroma[7] = 1.0;
        let segment = |start_s, end_s| ChordSegment {
            root: 0,
            quality: ChordQuality::Maj,
            confidence: 0.9,
            margin: 0.1,
            start_s,
            end_s,
            bass_pitch_class: None,
        };
        let harmony = HarmonyResult {
            chromagram: Chromagram {
                grid: FrameGrid::new(44100, 44100, 8192, 2048).unwrap(),
                frames: vec![chroma],
                global: chroma,
                per_octave: None,
            },
            key_detection: detect_key(&chroma, &KeyTemplates::new()).unwrap(),
            key: "C major".to_string(),
            chords: vec![segment(0.0, 2.0), segment(4.0, 7.0)],
            fused: false,
            confidence: 0.8,
        };
        assert!((harmony.chord_coverage(10.0) - 0.5).abs() < 1e-6);
        assert_eq!(harmony.chord_coverage(2.0), 1.0);
        assert_eq!(harmony.chord_coverage(0.0), 0.0);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&ComponentStatus::Degraded(vec![
            AnalysisFlag::SparseOnsets,
        ]))
        .unwrap();
        assert_eq!(json, r#"{"status":"degraded","flags":["sparse_onsets"]}"#);
        let json = serde_json::to_string(&ComponentStatus::Ok).unwrap();
        assert_eq!(json, r#"{"status":"ok"}"#);
    }
}
