//! Bar-pattern matching
//!
//! Hits are folded onto a one-bar sixteenth grid per instrument, giving the
//! fraction of bars in which each step is played. A catalogue pattern is a set
//! of lanes, one step string per instrument. The score is the mean over the
//! union of instruments (pattern lanes plus observed instruments) and steps of
//! `1 − |observed − expected|`.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{DrumHit, DrumKind};
use crate::features::beat_tracking::grid::STEPS_PER_BEAT;
use crate::features::beat_tracking::BeatGrid;

/// A catalogue entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrumPattern {
    /// Stable identifier
    pub id: String,

    /// Beats per bar the lanes are written for
    pub beats_per_bar: u32,

    /// Per-instrument step strings (`x` = hit, anything else = rest)
    pub lanes: BTreeMap<DrumKind, String>,
}

impl DrumPattern {
    /// Build a 4/4 pattern from `(kind, steps)` lanes
    pub fn new(id: &str, lanes: &[(DrumKind, &str)]) -> Self {
        Self {
            id: id.to_string(),
            beats_per_bar: 4,
            lanes: lanes.iter().map(|&(k, s)| (k, s.to_string())).collect(),
        }
    }

    /// Expected occupancy of one step (1.0 or 0.0)
    fn expects(&self, kind: DrumKind, step: usize) -> f32 {
        self.lanes
            .get(&kind)
            .and_then(|lane| lane.as_bytes().get(step))
            .map_or(0.0, |&c| if c == b'x' { 1.0 } else { 0.0 })
    }
}

/// Best catalogue match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternMatch {
    /// Identifier of the matched pattern
    pub pattern_id: String,

    /// Similarity (0.0-1.0)
    pub score: f32,
}

/// Built-in 4/4 pattern catalogue
pub fn default_catalogue() -> Vec<DrumPattern> {
    use DrumKind::*;
    vec![
        DrumPattern::new(
            "four_on_floor",
            &[
                (Kick, "x...x...x...x..."),
                (Clap, "....x.......x..."),
                (HiHat, "..x...x...x...x."),
            ],
        ),
        DrumPattern::new(
            "rock_backbeat",
            &[
                (Kick, "x.......x.x....."),
                (Snare, "....x.......x..."),
                (HiHat, "x.x.x.x.x.x.x.x."),
            ],
        ),
        DrumPattern::new(
            "half_time",
            &[
                (Kick, "x.........x....."),
                (Snare, "........x......."),
                (HiHat, "x.x.x.x.x.x.x.x."),
            ],
        ),
        DrumPattern::new(
            "breakbeat",
            &[
                (Kick, "x.x.......xx...."),
                (Snare, "....x..x.x..x..x"),
                (HiHat, "x.x.x.x.x.x.x.x."),
            ],
        ),
        DrumPattern::new(
            "afro_house",
            &[
                (Kick, "x...x...x...x..."),
                (Clap, "....x.......x..."),
                (HiHat, "..x...x...x...x."),
                (Perc, "x..x..x...x..x.."),
            ],
        ),
        DrumPattern::new(
            "trap",
            &[
                (Kick, "x......x..x....."),
                (Snare, "........x......."),
                (HiHat, "xxxxxxxxxxxxxxxx"),
            ],
        ),
    ]
}

/// Fraction of bars in which each (instrument, step) is played
///
/// Returns the occupancy map and the number of bars spanned.
pub fn occupancy(hits: &[DrumHit], grid: &BeatGrid) -> (BTreeMap<DrumKind, Vec<f32>>, usize) {
    let steps = (grid.beats_per_bar() * STEPS_PER_BEAT) as usize;
    let mut seen: BTreeMap<DrumKind, BTreeSet<(i32, usize)>> = BTreeMap::new();
    let mut bars = BTreeSet::new();

    for hit in hits {
        if let Some(pos) = grid.locate(hit.time_s) {
            seen.entry(hit.kind).or_default().insert((pos.bar, pos.step_in_bar()));
            bars.insert(pos.bar);
        }
    }

    let n_bars = match (bars.first(), bars.last()) {
        (Some(&lo), Some(&hi)) => (hi - lo + 1) as usize,
        _ => 0,
    };
    let mut out = BTreeMap::new();
    if n_bars == 0 {
        return (out, 0);
    }
    for (kind, cells) in seen {
        let mut lane = vec![0.0f32; steps];
        for (_, step) in cells {
            lane[step] += 1.0;
        }
        lane.iter_mut().for_each(|v| *v /= n_bars as f32);
        out.insert(kind, lane);
    }
    (out, n_bars)
}

/// Score hits against every catalogue pattern and return the best
///
/// Only patterns written for the grid's bar length take part. Ties keep the
/// earlier catalogue entry. `None` without hits, beats or a compatible
/// pattern.
pub fn match_pattern(
    hits: &[DrumHit],
    grid: &BeatGrid,
    catalogue: &[DrumPattern],
) -> Option<PatternMatch> {
    let (observed, n_bars) = occupancy(hits, grid);
    if n_bars == 0 {
        return None;
    }
    let steps = (grid.beats_per_bar() * STEPS_PER_BEAT) as usize;

    let mut best: Option<PatternMatch> = None;
    for pattern in catalogue
        .iter()
        .filter(|p| p.beats_per_bar == grid.beats_per_bar())
    {
        let kinds: BTreeSet<DrumKind> = pattern
            .lanes
            .keys()
            .chain(observed.keys())
            .copied()
            .collect();

        let mut total = 0.0f32;
        for &kind in &kinds {
            let lane = observed.get(&kind);
            for step in 0..steps {
                let p = lane.map_or(0.0, |l| l[step]);
                total += 1.0 - (p - pattern.expects(kind, step)).abs();
            }
        }
        let score = total / (kinds.len() * steps) as f32;

        if best.as_ref().is_none_or(|b| score > b.score) {
            best = Some(PatternMatch {
                pattern_id: pattern.id.clone(),
                score,
            });
        }
    }

    if let Some(m) = &best {
        log::debug!("Pattern match: {} ({:.3}) over {} bars", m.pattern_id, m.score, n_bars);
    }
    best
}
