//! Key clarity scoring
//!
//! Estimates how "tonal" vs "atonal" a track is: how far the best key
//! correlation rises above the average correlation over all 24 keys.

use super::Key;

/// Compute key clarity from key scores
///
/// # Arguments
///
/// * `scores` - All 24 key scores (correlations in [-1, 1])
///
/// # Returns
///
/// Clarity score (0.0-1.0), higher = more tonal
pub fn compute_key_clarity(scores: &[(Key, f32)]) -> f32 {
    if scores.is_empty() {
        return 0.0;
    }
    let top = scores
        .iter()
        .map(|&(_, s)| s)
        .fold(f32::NEG_INFINITY, f32::max);
    let mean = scores.iter().map(|&(_, s)| s).sum::<f32>() / scores.len() as f32;
    let headroom = 1.0 - mean;
    if !top.is_finite() || headroom <= f32::EPSILON {
        return 0.0;
    }
    let clarity = ((top - mean) / headroom).clamp(0.0, 1.0);
    log::debug!("Key clarity: top={:.3}, mean={:.3}, clarity={:.3}", top, mean, clarity);
    clarity
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_scores_have_no_clarity() {
        let scores: Vec<(Key, f32)> = (0..12).map(|r| (Key::Major(r), 0.0)).collect();
        assert_eq!(compute_key_clarity(&scores), 0.0);
        assert_eq!(compute_key_clarity(&[]), 0.0);
    }

    #[test]
    fn test_clear_peak() {
        let mut scores: Vec<(Key, f32)> = (0..12).map(|r| (Key::Minor(r), -0.1)).collect();
        scores.push((Key::Major(0), 0.9));
        let clarity = compute_key_clarity(&scores);
        assert!(clarity > 0.8, "clarity = {}", clarity);
    }
}
