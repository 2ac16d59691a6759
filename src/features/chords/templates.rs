//! Chord templates and per-frame scoring
//!
//! Each of the 96 templates (8 qualities × 12 roots) puts weight 1 on chord
//! tones and 0 elsewhere, with 7ths weighted lower (0.7 by default). A frame
//! is scored against every template by cosine similarity after its
//! broadband floor (the median pitch-class level) is removed.
//!
//! A 7th chord only wins over its own triad when it scores at least
//! [`SEVENTH_MIN_GAIN`] higher, so stray energy on the 7th degree does not
//! split a triad into 7th fragments.

use serde::{Deserialize, Serialize};

use super::{ChordLabel, ChordQuality};
use crate::features::chroma::normalization::{cosine_similarity, l2_norm};
use crate::features::chroma::Chroma;
use crate::features::onset::threshold::median_in_place;

/// Lead a 7th chord needs over its triad to be reported
pub const SEVENTH_MIN_GAIN: f32 = 0.04;

/// Best chord for one chroma frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChordFrame {
    /// Best-scoring chord, `None` for a silent frame
    pub label: Option<ChordLabel>,

    /// Cosine similarity of the best template (0.0-1.0)
    pub score: f32,

    /// Best score minus second-best score
    pub margin: f32,
}

impl ChordFrame {
    /// Frame with no chord
    pub fn silent() -> Self {
        Self {
            label: None,
            score: 0.0,
            margin: 0.0,
        }
    }
}

/// The 96 chord templates
#[derive(Debug, Clone)]
pub struct ChordTemplates {
    entries: Vec<(ChordLabel, Chroma)>,
}

impl ChordTemplates {
    /// Build templates with the given weight on 7th tones
    pub fn new(seventh_weight: f32) -> Self {
        let mut entries = Vec::with_capacity(12 * ChordQuality::ALL.len());
        for root in 0..12u8 {
            for quality in ChordQuality::ALL {
                let mut template = [0.0f32; 12];
                for &(interval, is_seventh) in quality.intervals() {
                    let pc = (root as usize + interval as usize) % 12;
                    template[pc] = if is_seventh { seventh_weight } else { 1.0 };
                }
                entries.push((ChordLabel::new(root, quality), template));
            }
        }
        Self { entries }
    }

    /// Number of templates
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if there are no templates
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Template of a chord
    pub fn template(&self, label: ChordLabel) -> Option<&Chroma> {
        self.entries
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, t)| t)
    }

    /// Cosine score of one chord against a chroma frame (floor removed)
    pub fn score(&self, chroma: &Chroma, label: ChordLabel) -> f32 {
        let chroma = remove_floor(chroma);
        self.template(label)
            .map(|t| cosine_similarity(&chroma, t).max(0.0))
            .unwrap_or(0.0)
    }

    /// Score a chroma frame against every template
    ///
    /// Ties keep the first template in root-then-quality order. A frame with
    /// nothing above its floor (silence, flat noise) is silent.
    pub fn score_frame(&self, chroma: &Chroma) -> ChordFrame {
        let chroma = remove_floor(chroma);
        if l2_norm(&chroma) <= f32::EPSILON {
            return ChordFrame::silent();
        }

        let mut best: Option<(ChordLabel, f32)> = None;
        let mut second = 0.0f32;
        for (label, template) in &self.entries {
            let s = cosine_similarity(&chroma, template).max(0.0);
            match best {
                Some((_, b)) if s <= b => second = second.max(s),
                Some((_, b)) => {
                    second = second.max(b);
                    best = Some((*label, s));
                }
                None => best = Some((*label, s)),
            }
        }

        let Some((label, score)) = best else {
            return ChordFrame::silent();
        };

        let triad = ChordLabel::new(label.root, label.quality.triad());
        if triad != label {
            let triad_score = self
                .template(triad)
                .map(|t| cosine_similarity(&chroma, t).max(0.0))
                .unwrap_or(0.0);
            if score - triad_score < SEVENTH_MIN_GAIN {
                return ChordFrame {
                    label: Some(triad),
                    score: triad_score,
                    margin: 0.0,
                };
            }
        }

        ChordFrame {
            label: Some(label),
            score,
            margin: (score - second).max(0.0),
        }
    }
}

/// Subtract the median pitch-class level, clamping at zero
fn remove_floor(chroma: &Chroma) -> Chroma {
    let mut sorted = *chroma;
    let floor = median_in_place(&mut sorted);
    let mut out = *chroma;
    for v in out.iter_mut() {
        *v = (*v - floor).max(0.0);
    }
    out
}

impl Default for ChordTemplates {
    fn default() -> Self {
        Self::new(0.7)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chroma_of(pcs: &[(usize, f32)]) -> Chroma {
        let mut c = [0.0f32; 12];
        for &(pc, v) in pcs {
            c[pc] = v;
        }
        c
    }

    #[test]
    fn test_template_count() {
        assert_eq!(ChordTemplates::default().len(), 96);
    }

    #[test]
    fn test_seventh_weight() {
        let t = ChordTemplates::new(0.7);
        let g7 = t.template(ChordLabel::new(7, ChordQuality::Dom7)).unwrap();
        assert_eq!(g7[7], 1.0);
        assert_eq!(g7[11], 1.0);
        assert_eq!(g7[2], 1.0);
        assert_eq!(g7[5], 0.7);
    }

    #[test]
    fn test_triads() {
        let t = ChordTemplates::default();
        let frame = t.score_frame(&chroma_of(&[(0, 1.0), (4, 1.0), (7, 1.0)]));
        assert_eq!(frame.label, Some(ChordLabel::new(0, ChordQuality::Maj)));
        assert!((frame.score - 1.0).abs() < 1e-5);
        assert!(frame.margin > 0.0 && frame.margin < 0.1);

        let frame = t.score_frame(&chroma_of(&[(9, 1.0), (0, 1.0), (4, 1.0)]));
        assert_eq!(frame.label, Some(ChordLabel::new(9, ChordQuality::Min)));
    }

    #[test]
    fn test_seventh_chords() {
        let t = ChordTemplates::default();
        let frame = t.score_frame(&chroma_of(&[(7, 1.0), (11, 1.0), (2, 1.0), (5, 0.8)]));
        assert_eq!(frame.label, Some(ChordLabel::new(7, ChordQuality::Dom7)));

        let frame = t.score_frame(&chroma_of(&[(11, 1.0), (2, 1.0), (5, 1.0), (9, 0.8)]));
        assert_eq!(frame.label, Some(ChordLabel::new(11, ChordQuality::Hdim7)));
    }

    #[test]
    fn test_broadband_floor_keeps_triad() {
        // Click-like energy on every pitch class, B slightly above the rest
        let t = ChordTemplates::default();
        let mut chroma = [0.3f32; 12];
        chroma[0] = 1.0;
        chroma[4] = 0.9;
        chroma[7] = 0.9;
        chroma[11] = 0.4;
        let frame = t.score_frame(&chroma);
        assert_eq!(frame.label, Some(ChordLabel::new(0, ChordQuality::Maj)));

        // A single arpeggio note over the same floor still reads as C major
        let mut chroma = [0.35f32; 12];
        chroma[4] = 1.0;
        let frame = t.score_frame(&chroma);
        assert_eq!(frame.label, Some(ChordLabel::new(0, ChordQuality::Maj)));
    }

    #[test]
    fn test_faint_seventh_reads_as_triad() {
        let t = ChordTemplates::default();
        // Cmaj7 edges out Cmaj here, but by less than the required gain
        let chroma = chroma_of(&[(0, 1.0), (4, 1.0), (7, 1.0), (11, 0.5)]);
        let cmaj = ChordLabel::new(0, ChordQuality::Maj);
        let cmaj7 = ChordLabel::new(0, ChordQuality::Maj7);
        assert!(t.score(&chroma, cmaj7) > t.score(&chroma, cmaj));
        let frame = t.score_frame(&chroma);
        assert_eq!(frame.label, Some(cmaj));
        assert!((frame.score - t.score(&chroma, cmaj)).abs() < 1e-6);
        assert_eq!(ChordQuality::Dom7.triad(), ChordQuality::Maj);
        assert_eq!(ChordQuality::Hdim7.triad(), ChordQuality::Dim);
    }

    #[test]
    fn test_flat_chroma_is_silent() {
        let frame = ChordTemplates::default().score_frame(&[0.5; 12]);
        assert_eq!(frame.label, None);
    }

    #[test]
    fn test_silent_frame() {
        let frame = ChordTemplates::default().score_frame(&[0.0; 12]);
        assert_eq!(frame.label, None);
        assert_eq!(frame.score, 0.0);
    }
}
