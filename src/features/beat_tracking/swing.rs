//! Swing estimation
//!
//! For every beat interval, the onsets lying between 25% and 85% of the way
//! to the next beat are taken as off-beat 8ths. Swing is the median relative
//! position of those onsets scaled to [0, 100]: 50 is straight, ≈66.7 is a
//! 2:1 triplet feel.

use crate::features::onset::threshold::median;

/// Swing reported when no off-beat onsets are found
pub const STRAIGHT_SWING: f32 = 50.0;

/// Estimate swing from beat times and onset times (both sorted, seconds)
pub fn estimate_swing(beats: &[f32], onset_times: &[f32]) -> f32 {
    if beats.len() < 2 || onset_times.is_empty() {
        return STRAIGHT_SWING;
    }

    let mut ratios = Vec::new();
    let mut j = 0;
    for pair in beats.windows(2) {
        let (start, end) = (pair[0], pair[1]);
        let span = end - start;
        if span <= 0.0 {
            continue;
        }
        while j < onset_times.len() && onset_times[j] < start {
            j += 1;
        }
        let mut k = j;
        while k < onset_times.len() && onset_times[k] < end {
            let ratio = (onset_times[k] - start) / span;
            if (0.25..=0.85).contains(&ratio) {
                ratios.push(ratio);
            }
            k += 1;
        }
    }

    if ratios.is_empty() {
        return STRAIGHT_SWING;
    }
    (median(&ratios) * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beats() -> Vec<f32> {
        (0..9).map(|i| i as f32 * 0.5).collect()
    }

    #[test]
    fn test_straight_eighths() {
        let onsets: Vec<f32> = (0..16).map(|i| i as f32 * 0.25).collect();
        assert!((estimate_swing(&beats(), &onsets) - 50.0).abs() < 1e-3);
    }

    #[test]
    fn test_triplet_swing() {
        let mut onsets = Vec::new();
        for i in 0..8 {
            onsets.push(i as f32 * 0.5);
            onsets.push(i as f32 * 0.5 + 0.5 * 2.0 / 3.0);
        }
        let swing = estimate_swing(&beats(), &onsets);
        assert!((swing - 66.67).abs() < 0.1, "swing {}", swing);
    }

    #[test]
    fn test_no_offbeats_is_straight() {
        let onsets: Vec<f32> = beats();
        assert_eq!(estimate_swing(&beats(), &onsets), STRAIGHT_SWING);
        assert_eq!(estimate_swing(&[], &onsets), STRAIGHT_SWING);
    }
}
