//! Key detection algorithm
//!
//! Correlates the global chromagram with the 24 rotated Krumhansl-Kessler
//! profiles (Pearson correlation) and returns the best match.
//!
//! Confidence is the relative lead of the best key over the runner-up:
//! `(top − second) / top`, clamped to [0, 1].
//!
//! # Reference
//!
//! Krumhansl, C. L. (1990). *Cognitive Foundations of Musical Pitch*.
//! Oxford University Press. (Chapter 4: key-finding algorithm)

use super::{compute_key_clarity, templates::KeyTemplates, Key, KeyDetectionResult};
use crate::error::AnalysisError;
use crate::features::chroma::Chroma;

/// Number of ranked keys kept in [`KeyDetectionResult::top_keys`]
pub const TOP_KEYS: usize = 3;

/// Pearson correlation of two 12-vectors
///
/// Returns 0.0 if either vector is constant.
pub fn pearson(a: &[f32; 12], b: &[f32; 12]) -> f32 {
    let mean_a = a.iter().sum::<f32>() / 12.0;
    let mean_b = b.iter().sum::<f32>() / 12.0;
    let mut num = 0.0f32;
    let mut var_a = 0.0f32;
    let mut var_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        let da = x - mean_a;
        let db = y - mean_b;
        num += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    let denom = (var_a * var_b).sqrt();
    if denom <= 1e-12 || !denom.is_finite() {
        return 0.0;
    }
    (num / denom).clamp(-1.0, 1.0)
}

/// Detect musical key from a global chroma vector
///
/// # Arguments
///
/// * `chroma` - Global chromagram (12 pitch classes, C..B)
/// * `templates` - Key templates (Krumhansl-Kessler profiles)
///
/// # Returns
///
/// Key detection result with:
/// - Detected key (major or minor, 0-11)
/// - Confidence score (0.0-1.0)
/// - All 24 key scores (ranked)
///
/// A silent or flat chroma correlates with nothing; the result then carries
/// C major with zero confidence and zero clarity.
///
/// # Errors
///
/// Returns `AnalysisError::ProcessingError` if the chroma holds non-finite
/// values.
///
/// # Example
///
/// ```
/// use stratum_studio::features::key::{detect_key, Key, KeyTemplates};
///
/// let mut chroma = [0.0f32; 12];
/// chroma[0] = 1.0; // C
/// chroma[4] = 0.5; // E
/// chroma[7] = 0.5; // G
/// let result = detect_key(&chroma, &KeyTemplates::new())?;
/// assert_eq!(result.key, Key::Major(0));
/// assert_eq!(result.key.display_name(), "C major");
/// # Ok::<(), stratum_studio::AnalysisError>(())
/// ```
pub fn detect_key(
    chroma: &Chroma,
    templates: &KeyTemplates,
) -> Result<KeyDetectionResult, AnalysisError> {
    if chroma.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::ProcessingError(
            "Chroma vector contains non-finite values".to_string(),
        ));
    }

    let mut scores: Vec<(Key, f32)> = templates
        .iter()
        .map(|(key, template)| (key, pearson(chroma, template)))
        .collect();

    // Stable sort keeps majors ahead of minors on exact ties
    scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let (best_key, best_score) = scores[0];
    let second_score = scores.get(1).map(|&(_, s)| s).unwrap_or(0.0);

    let confidence = if best_score > 0.0 {
        ((best_score - second_score) / best_score).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let clarity = compute_key_clarity(&scores);
    let top_keys: Vec<(Key, f32)> = scores.iter().take(TOP_KEYS).copied().collect();

    log::debug!(
        "Detected key: {}, score: {:.4}, confidence: {:.4}, clarity: {:.4}",
        best_key.display_name(),
        best_score,
        confidence,
        clarity
    );

    Ok(KeyDetectionResult {
        key: best_key,
        confidence,
        clarity,
        all_scores: scores,
        top_keys,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::key::templates::{MAJOR_PROFILE, MINOR_PROFILE};

    #[test]
    fn test_pearson() {
        let a: [f32; 12] = std::array::from_fn(|i| i as f32);
        assert!((pearson(&a, &a) - 1.0).abs() < 1e-5);
        let b: [f32; 12] = std::array::from_fn(|i| -(i as f32));
        assert!((pearson(&a, &b) + 1.0).abs() < 1e-5);
        assert_eq!(pearson(&a, &[1.0; 12]), 0.0);
    }

    #[test]
    fn test_profiles_detect_themselves() {
        let templates = KeyTemplates::new();
        for root in 0..12 {
            let result = detect_key(&templates.major[root], &templates).unwrap();
            assert_eq!(result.key, Key::Major(root as u32));
            let result = detect_key(&templates.minor[root], &templates).unwrap();
            assert_eq!(result.key, Key::Minor(root as u32));
        }
        let result = detect_key(&MAJOR_PROFILE, &templates).unwrap();
        assert!((result.all_scores[0].1 - 1.0).abs() < 1e-5);
        let result = detect_key(&MINOR_PROFILE, &templates).unwrap();
        assert_eq!(result.key, Key::Minor(0));
    }

    #[test]
    fn test_a_minor_triad() {
        let mut chroma = [0.0f32; 12];
        chroma[9] = 1.0; // A
        chroma[0] = 0.6; // C
        chroma[4] = 0.7; // E
        let result = detect_key(&chroma, &KeyTemplates::new()).unwrap();
        assert_eq!(result.key, Key::Minor(9));
    }

    #[test]
    fn test_scores_ranked_and_confidence_bounded() {
        let mut chroma = [0.1f32; 12];
        chroma[2] = 1.0;
        chroma[9] = 0.8;
        let result = detect_key(&chroma, &KeyTemplates::new()).unwrap();
        assert_eq!(result.all_scores.len(), 24);
        assert_eq!(result.top_keys.len(), TOP_KEYS);
        for w in result.all_scores.windows(2) {
            assert!(w[0].1 >= w[1].1);
        }
        assert!((0.0..=1.0).contains(&result.confidence));
    }

    #[test]
    fn test_silent_chroma() {
        let result = detect_key(&[0.0; 12], &KeyTemplates::new()).unwrap();
        assert_eq!(result.key, Key::Major(0));
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.clarity, 0.0);
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut chroma = [0.0f32; 12];
        chroma[5] = f32::NAN;
        assert!(detect_key(&chroma, &KeyTemplates::new()).is_err());
    }
}
