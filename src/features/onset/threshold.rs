//! Adaptive thresholding utilities for onset detection
//!
//! The onset threshold tracks the local median of the envelope so that
//! sustained dense passages do not fire on every frame while isolated
//! transients in quiet passages still do.

/// Median of a slice (0.0 for empty input)
///
/// Sorts a copy; NaNs compare equal.
pub fn median(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    median_in_place(&mut sorted)
}

/// Median that sorts `values` in place
pub fn median_in_place(values: &mut [f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = values.len();
    if n.is_multiple_of(2) {
        (values[n / 2 - 1] + values[n / 2]) * 0.5
    } else {
        values[n / 2]
    }
}

/// Linear-interpolated percentile (`p` in [0, 1]) of a slice
///
/// Returns 0.0 for empty input.
pub fn percentile(values: &[f32], p: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let pos = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f32;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f32;
    sorted[lo] * (1.0 - frac) + sorted[hi] * frac
}

/// Centered sliding median with `half_window` frames on each side
///
/// The window is truncated at the edges. One working buffer is reused for
/// every position.
pub fn sliding_median(values: &[f32], half_window: usize) -> Vec<f32> {
    let n = values.len();
    let mut window = Vec::with_capacity(2 * half_window + 1);
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let lo = i.saturating_sub(half_window);
        let hi = (i + half_window + 1).min(n);
        window.clear();
        window.extend_from_slice(&values[lo..hi]);
        out.push(median_in_place(&mut window));
    }
    out
}

/// Per-frame onset threshold: `max(multiplier × local median, floor)`
pub fn adaptive_threshold(
    values: &[f32],
    half_window: usize,
    multiplier: f32,
    floor: f32,
) -> Vec<f32> {
    sliding_median(values, half_window)
        .into_iter()
        .map(|m| (multiplier * m).max(floor))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[4.0, 1.0, 2.0, 3.0]), 2.5);
        assert_eq!(median(&[]), 0.0);
    }

    #[test]
    fn test_percentile_interpolates() {
        let values = [0.0, 10.0, 20.0, 30.0, 40.0];
        assert_eq!(percentile(&values, 0.0), 0.0);
        assert_eq!(percentile(&values, 1.0), 40.0);
        assert!((percentile(&values, 0.95) - 38.0).abs() < 1e-4);
        assert!((percentile(&values, 0.1) - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_sliding_median_ignores_isolated_spike() {
        let mut values = vec![1.0f32; 21];
        values[10] = 50.0;
        let med = sliding_median(&values, 3);
        assert_eq!(med.len(), values.len());
        assert!(med.iter().all(|&m| m == 1.0));
    }

    #[test]
    fn test_adaptive_threshold_floor() {
        let values = vec![-0.2f32; 10];
        let thr = adaptive_threshold(&values, 2, 1.3, 0.5);
        assert!(thr.iter().all(|&t| t == 0.5));
    }
}
