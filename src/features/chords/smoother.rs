//! Chord smoothing state machine
//!
//! States: `Idle` → `Candidate(c, k)` → `Stable(c)`.
//!
//! - `Idle`: a frame scoring at least `enter_score` starts `Candidate(c, 1)`.
//! - `Candidate(c, k)`: the same chord increments `k`; a different chord
//!   whose score beats the candidate's by `switch_margin` restarts the
//!   candidate. Once `k ≥ min_frames` and the candidate spans
//!   `min_duration_s` (first frame through the end of the current hop), it
//!   is promoted to `Stable(c)` and a segment opens at
//!   the candidate's first frame.
//! - `Stable(c)`: the segment extends until another chord is promoted. A
//!   frame that returns to `c` drops any pending candidate.
//!
//! The smoother is also driven frame-by-frame by the live chord meter.

use serde::{Deserialize, Serialize};

use super::{ChordFrame, ChordLabel, ChordSegment};
use crate::config::ChordSmootherConfig;

/// Observable smoother state
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SmootherState {
    /// No chord yet
    Idle,
    /// A chord is accumulating evidence
    Candidate {
        /// Candidate chord
        chord: ChordLabel,
        /// Consecutive supporting frames
        frames: usize,
    },
    /// A chord is established
    Stable {
        /// Current chord
        chord: ChordLabel,
    },
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    chord: ChordLabel,
    frames: usize,
    start_s: f32,
    score_sum: f32,
    margin_sum: f32,
}

impl Pending {
    fn start(chord: ChordLabel, time_s: f32, frame: &ChordFrame) -> Self {
        Self {
            chord,
            frames: 1,
            start_s: time_s,
            score_sum: frame.score,
            margin_sum: frame.margin,
        }
    }

    fn mean_score(&self) -> f32 {
        self.score_sum / self.frames.max(1) as f32
    }
}

#[derive(Debug, Clone, Copy)]
struct Open {
    chord: ChordLabel,
    start_s: f32,
    frames: usize,
    score_sum: f32,
    margin_sum: f32,
}

impl Open {
    fn close(self, end_s: f32) -> Option<ChordSegment> {
        if end_s.is_nan() || end_s <= self.start_s {
            return None;
        }
        let n = self.frames.max(1) as f32;
        Some(ChordSegment {
            root: self.chord.root,
            quality: self.chord.quality,
            confidence: (self.score_sum / n).clamp(0.0, 1.0),
            margin: (self.margin_sum / n).max(0.0),
            start_s: self.start_s,
            end_s,
            bass_pitch_class: None,
        })
    }
}

/// Frame-by-frame chord smoother
#[derive(Debug, Clone)]
pub struct ChordSmoother {
    config: ChordSmootherConfig,
    hop_s: f32,
    stable: Option<Open>,
    pending: Option<Pending>,
    segments: Vec<ChordSegment>,
}

impl ChordSmoother {
    /// Create an idle smoother for frames `hop_s` seconds apart
    pub fn new(config: ChordSmootherConfig, hop_s: f32) -> Self {
        Self {
            config,
            hop_s: hop_s.max(0.0),
            stable: None,
            pending: None,
            segments: Vec::new(),
        }
    }

    /// Current state
    pub fn state(&self) -> SmootherState {
        match (self.pending, self.stable) {
            (Some(p), _) => SmootherState::Candidate {
                chord: p.chord,
                frames: p.frames,
            },
            (None, Some(s)) => SmootherState::Stable { chord: s.chord },
            (None, None) => SmootherState::Idle,
        }
    }

    /// Current stable chord, if any
    pub fn current(&self) -> Option<ChordLabel> {
        self.stable.map(|s| s.chord)
    }

    /// Segments closed so far
    pub fn segments(&self) -> &[ChordSegment] {
        &self.segments
    }

    /// Forget all state
    pub fn reset(&mut self) {
        self.stable = None;
        self.pending = None;
        self.segments.clear();
    }

    /// Feed one scored frame at `time_s`
    ///
    /// Returns the newly promoted chord when a promotion happens.
    pub fn push(&mut self, time_s: f32, frame: &ChordFrame) -> Option<ChordLabel> {
        let Some(label) = frame.label else {
            // Silence never supports a candidate
            self.pending = None;
            return None;
        };

        if let Some(open) = self.stable.as_mut() {
            if open.chord == label {
                open.frames += 1;
                open.score_sum += frame.score;
                open.margin_sum += frame.margin;
                self.pending = None;
                return None;
            }
        }

        match self.pending.as_mut() {
            Some(p) if p.chord == label => {
                p.frames += 1;
                p.score_sum += frame.score;
                p.margin_sum += frame.margin;
            }
            Some(p) => {
                if frame.score >= p.mean_score() + self.config.switch_margin {
                    *p = Pending::start(label, time_s, frame);
                }
            }
            None => {
                if frame.score >= self.config.enter_score {
                    self.pending = Some(Pending::start(label, time_s, frame));
                }
            }
        }

        self.try_promote(time_s)
    }

    fn try_promote(&mut self, time_s: f32) -> Option<ChordLabel> {
        let p = self.pending?;
        let span_s = time_s + self.hop_s - p.start_s;
        if p.frames < self.config.min_frames || span_s < self.config.min_duration_s {
            return None;
        }

        if let Some(open) = self.stable.take() {
            if let Some(segment) = open.close(p.start_s) {
                self.segments.push(segment);
            }
        }
        self.stable = Some(Open {
            chord: p.chord,
            start_s: p.start_s,
            frames: p.frames,
            score_sum: p.score_sum,
            margin_sum: p.margin_sum,
        });
        self.pending = None;
        log::debug!("Chord {} stable from {:.3}s", p.chord, p.start_s);
        Some(p.chord)
    }

    /// Close the active segment at `end_s` and return all segments
    pub fn finish(mut self, end_s: f32) -> Vec<ChordSegment> {
        if let Some(open) = self.stable.take() {
            if let Some(segment) = open.close(end_s) {
                self.segments.push(segment);
            }
        }
        self.segments
    }
}
