//! Beat grid and grid queries

use serde::{Deserialize, Serialize};

use super::time_signature::TimeSignature;
use crate::features::period::TempoCorrection;

/// Sixteenth-note steps per beat
pub const STEPS_PER_BEAT: u32 = 4;

/// Beat grid structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatGrid {
    /// Tempo after octave normalisation and beat regression
    pub bpm: f32,

    /// Tempo before octave normalisation
    pub bpm_original: f32,

    /// Octave correction applied to `bpm_original`
    pub auto_corrected: TempoCorrection,

    /// Confidence (0.0-1.0)
    pub confidence: f32,

    /// All beat times in seconds, strictly increasing
    pub beats: Vec<f32>,

    /// Downbeat times (beat 1) in seconds; a subset of `beats`
    pub downbeats: Vec<f32>,

    /// Bar length
    pub time_signature: TimeSignature,

    /// Swing in [0, 100]; 50 is straight
    pub swing: f32,
}

/// Position of a time on the grid, rounded to the nearest sixteenth
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridPosition {
    /// Bar number; bar 1 starts at the first downbeat, earlier bars are ≤ 0
    pub bar: i32,

    /// Beat within the bar, 1-based
    pub beat: u32,

    /// Sixteenth within the beat, 0..4
    pub subbeat: u32,
}

impl GridPosition {
    /// Sixteenth step within the bar, `0..4·beats_per_bar`
    pub fn step_in_bar(&self) -> usize {
        ((self.beat - 1) * STEPS_PER_BEAT + self.subbeat) as usize
    }
}

impl BeatGrid {
    /// Grid with no beats, used when no tempo could be estimated
    pub fn empty(bpm: f32) -> Self {
        Self {
            bpm,
            bpm_original: bpm,
            auto_corrected: TempoCorrection::None,
            confidence: 0.0,
            beats: Vec::new(),
            downbeats: Vec::new(),
            time_signature: TimeSignature::FourFour,
            swing: 50.0,
        }
    }

    /// Nominal beat period in seconds
    pub fn beat_period(&self) -> f32 {
        if self.bpm > 0.0 {
            60.0 / self.bpm
        } else {
            0.5
        }
    }

    /// Beats per bar
    pub fn beats_per_bar(&self) -> u32 {
        self.time_signature.beats_per_bar()
    }

    /// Index in `beats` of the first downbeat (0 when there are none)
    pub fn downbeat_phase(&self) -> usize {
        self.downbeats
            .first()
            .and_then(|&d| self.beats.iter().position(|&b| b == d))
            .unwrap_or(0)
    }

    /// Continuous beat index of `time_s`
    ///
    /// Interpolates between beats and extrapolates with the nominal period
    /// outside them. `None` if the grid has no beats.
    pub fn beat_position(&self, time_s: f32) -> Option<f32> {
        let first = *self.beats.first()?;
        let last = *self.beats.last()?;
        let period = self.beat_period();

        if time_s <= first {
            return Some((time_s - first) / period);
        }
        if time_s >= last {
            return Some((self.beats.len() - 1) as f32 + (time_s - last) / period);
        }
        // First beat strictly after time_s
        let k = self.beats.partition_point(|&b| b <= time_s);
        let (a, b) = (self.beats[k - 1], self.beats[k]);
        Some((k - 1) as f32 + (time_s - a) / (b - a))
    }

    /// Time of a continuous beat index (inverse of [`beat_position`](Self::beat_position))
    pub fn time_at(&self, beat_index: i64, fraction: f32) -> Option<f32> {
        let n = self.beats.len() as i64;
        if n == 0 {
            return None;
        }
        let period = self.beat_period();
        let position = beat_index as f32 + fraction;
        if position <= 0.0 {
            return Some(self.beats[0] + position * period);
        }
        if position >= (n - 1) as f32 {
            return Some(self.beats[(n - 1) as usize] + (position - (n - 1) as f32) * period);
        }
        let k = position.floor() as usize;
        let frac = position - k as f32;
        Some(self.beats[k] + frac * (self.beats[k + 1] - self.beats[k]))
    }

    /// Bar, beat and sixteenth nearest to `time_s`
    pub fn locate(&self, time_s: f32) -> Option<GridPosition> {
        let position = self.beat_position(time_s)?;
        let m = self.beats_per_bar() as i64;
        let relative = position - self.downbeat_phase() as f32;
        let step = (relative * STEPS_PER_BEAT as f32).round() as i64;
        let steps_per_bar = m * STEPS_PER_BEAT as i64;

        let bar = step.div_euclid(steps_per_bar) + 1;
        let in_bar = step.rem_euclid(steps_per_bar);
        Some(GridPosition {
            bar: bar as i32,
            beat: (in_bar / STEPS_PER_BEAT as i64) as u32 + 1,
            subbeat: (in_bar % STEPS_PER_BEAT as i64) as u32,
        })
    }

    /// Time of a grid position (start of the given sixteenth)
    pub fn time_of(&self, position: GridPosition) -> Option<f32> {
        let m = self.beats_per_bar() as i64;
        let beat = (position.bar as i64 - 1) * m
            + (position.beat as i64 - 1)
            + self.downbeat_phase() as i64;
        self.time_at(beat, position.subbeat as f32 / STEPS_PER_BEAT as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> BeatGrid {
        let beats: Vec<f32> = (0..16).map(|i| 1.0 + i as f32 * 0.5).collect();
        BeatGrid {
            bpm: 120.0,
            bpm_original: 120.0,
            auto_corrected: TempoCorrection::None,
            confidence: 0.9,
            downbeats: beats.iter().skip(1).step_by(4).copied().collect(),
            beats,
            time_signature: TimeSignature::FourFour,
            swing: 50.0,
        }
    }

    #[test]
    fn test_beat_position_interpolates_and_extrapolates() {
        let g = grid();
        assert_eq!(g.beat_position(1.0), Some(0.0));
        assert_eq!(g.beat_position(1.25), Some(0.5));
        assert_eq!(g.beat_position(0.5), Some(-1.0));
        assert_eq!(g.beat_position(9.0), Some(16.0));
    }

    #[test]
    fn test_time_at_inverts_position() {
        let g = grid();
        assert_eq!(g.time_at(2, 0.5), Some(2.25));
        assert_eq!(g.time_at(-2, 0.0), Some(0.0));
        assert_eq!(g.time_at(17, 0.0), Some(9.5));
    }

    #[test]
    fn test_locate_uses_downbeat_phase() {
        let g = grid();
        // First downbeat is beats[1] = 1.5 s
        let pos = g.locate(1.5).unwrap();
        assert_eq!((pos.bar, pos.beat, pos.subbeat), (1, 1, 0));
        let pos = g.locate(1.0 + 0.5 * 3.25).unwrap();
        assert_eq!((pos.bar, pos.beat, pos.subbeat), (1, 3, 1));
        let pos = g.locate(1.0).unwrap();
        assert_eq!((pos.bar, pos.beat), (0, 4));
        assert_eq!(pos.step_in_bar(), 12);
    }

    #[test]
    fn test_time_of_round_trips_locate() {
        let g = grid();
        let pos = g.locate(3.125).unwrap();
        assert!((g.time_of(pos).unwrap() - 3.125).abs() < 1e-5);
    }

    #[test]
    fn test_empty_grid() {
        let g = BeatGrid::empty(120.0);
        assert!(g.locate(1.0).is_none());
        assert!(g.time_at(0, 0.0).is_none());
    }
}
