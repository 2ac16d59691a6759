//! Beat-grid alignment of chord segments
//!
//! Segment boundaries snap to the nearest beat (ties go to the earlier
//! beat). After snapping every segment spans at least one beat: a segment
//! that collapses is stretched to the next beat, or dropped when no beat
//! follows. Neighbours that end up with the same chord are merged.

use super::ChordSegment;

/// Index of the beat nearest to `time_s` (ties → earlier beat)
///
/// `beats` must be non-empty and sorted.
fn nearest_beat(beats: &[f32], time_s: f32) -> usize {
    let after = beats.partition_point(|&b| b < time_s);
    if after == 0 {
        return 0;
    }
    if after >= beats.len() {
        return beats.len() - 1;
    }
    let before = after - 1;
    if time_s - beats[before] <= beats[after] - time_s {
        before
    } else {
        after
    }
}

/// Snap chord segments to a beat grid
///
/// Returns the segments unchanged when fewer than two beats are available.
///
/// # Example
///
/// ```
/// use stratum_studio::features::chords::{align_to_grid, ChordQuality, ChordSegment};
///
/// let seg = |root, start_s, end_s| ChordSegment {
///     root,
///     quality: ChordQuality::Maj,
///     confidence: 0.9,
///     margin: 0.05,
///     start_s,
///     end_s,
///     bass_pitch_class: None,
/// };
/// let beats: Vec<f32> = (0..9).map(|i| i as f32 * 0.5).collect();
/// let aligned = align_to_grid(&[seg(0, 0.1, 2.1), seg(7, 2.1, 3.9)], &beats);
/// assert_eq!(aligned[0].start_s, 0.0);
/// assert_eq!(aligned[0].end_s, 2.0);
/// assert_eq!(aligned[1].start_s, 2.0);
/// assert_eq!(aligned[1].end_s, 4.0);
/// ```
pub fn align_to_grid(segments: &[ChordSegment], beats: &[f32]) -> Vec<ChordSegment> {
    if beats.len() < 2 {
        return segments.to_vec();
    }

    let mut aligned: Vec<ChordSegment> = Vec::with_capacity(segments.len());
    let mut floor = 0usize;
    for segment in segments {
        let start = nearest_beat(beats, segment.start_s).max(floor);
        let mut end = nearest_beat(beats, segment.end_s);
        if end <= start {
            if start + 1 >= beats.len() {
                log::debug!(
                    "Dropping chord {} at {:.3}s: no beat left after snapping",
                    segment.symbol(),
                    segment.start_s
                );
                continue;
            }
            end = start + 1;
        }
        floor = end;

        if let Some(prev) = aligned.last_mut() {
            if prev.label() == segment.label() && prev.bass_pitch_class == segment.bass_pitch_class
            {
                let (a, b) = (prev.duration(), beats[end] - beats[start]);
                let total = (a + b).max(f32::EPSILON);
                prev.confidence = (prev.confidence * a + segment.confidence * b) / total;
                prev.margin = (prev.margin * a + segment.margin * b) / total;
                prev.end_s = beats[end];
                continue;
            }
        }

        aligned.push(ChordSegment {
            start_s: beats[start],
            end_s: beats[end],
            ..segment.clone()
        });
    }

    log::debug!(
        "Aligned {} chord segments to {} beats ({} remain)",
        segments.len(),
        beats.len(),
        aligned.len()
    );
    aligned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::chords::ChordQuality;

    fn seg(root: u8, start_s: f32, end_s: f32) -> ChordSegment {
        ChordSegment {
            root,
            quality: ChordQuality::Maj,
            confidence: 0.9,
            margin: 0.05,
            start_s,
            end_s,
            bass_pitch_class: None,
        }
    }

    fn beats() -> Vec<f32> {
        (0..9).map(|i| i as f32 * 0.5).collect()
    }

    #[test]
    fn test_nearest_beat_tie_prefers_earlier() {
        let b = beats();
        assert_eq!(nearest_beat(&b, 0.25), 0);
        assert_eq!(nearest_beat(&b, 0.26), 1);
        assert_eq!(nearest_beat(&b, -1.0), 0);
        assert_eq!(nearest_beat(&b, 99.0), 8);
    }

    #[test]
    fn test_short_segment_stretched_to_one_beat() {
        let aligned = align_to_grid(&[seg(0, 0.0, 1.05), seg(5, 1.05, 1.2), seg(7, 1.2, 4.0)], &beats());
        assert_eq!(aligned.len(), 3);
        assert_eq!(aligned[1].start_s, 1.0);
        assert_eq!(aligned[1].end_s, 1.5);
        assert_eq!(aligned[2].start_s, 1.5);
        for s in &aligned {
            assert!(s.end_s - s.start_s >= 0.5 - 1e-6);
        }
        for w in aligned.windows(2) {
            assert!(w[0].end_s <= w[1].start_s);
        }
    }

    #[test]
    fn test_same_chord_neighbours_merge() {
        let aligned = align_to_grid(&[seg(0, 0.0, 1.0), seg(0, 1.0, 2.0)], &beats());
        assert_eq!(aligned.len(), 1);
        assert_eq!(aligned[0].end_s, 2.0);
    }

    #[test]
    fn test_segment_past_last_beat_dropped() {
        let aligned = align_to_grid(&[seg(0, 0.0, 3.9), seg(7, 3.95, 4.2)], &beats());
        assert_eq!(aligned.len(), 1);
        assert_eq!(aligned[0].end_s, 4.0);
    }

    #[test]
    fn test_no_grid_is_identity() {
        let segments = vec![seg(0, 0.1, 0.9)];
        assert_eq!(align_to_grid(&segments, &[1.0]), segments);
    }
}
