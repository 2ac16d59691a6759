//! Dynamic-programming beat placement
//!
//! Maximises `Σ O(bᵢ) − λ·Σ (ln((bᵢ₊₁ − bᵢ)/P))²` over beat sequences, where
//! `O` is the onset envelope and `P` the target beat period in frames.
//!
//! # Reference
//!
//! Ellis, D. P. W. (2007). Beat Tracking by Dynamic Programming.
//! *Journal of New Music Research*, 36(1), 51-60.

use crate::analysis::context::Suspend;
use crate::error::AnalysisError;

/// Place beats on an envelope
///
/// Each frame `t` links to the best predecessor in `[t − 2P, t − P/2]`
/// unless every predecessor would lower its score, in which case a new chain
/// starts at `t`. The backtrace starts from the best-scoring frame in the
/// final period. Returns strictly increasing frame indices.
pub fn place_beats(
    envelope: &[f32],
    period_frames: f32,
    lambda: f32,
    suspend: &mut dyn Suspend,
) -> Result<Vec<usize>, AnalysisError> {
    let n = envelope.len();
    if n == 0 || period_frames.is_nan() || period_frames < 1.0 {
        return Ok(Vec::new());
    }

    let min_back = (period_frames / 2.0).round().max(1.0) as usize;
    let max_back = (2.0 * period_frames).round() as usize;

    // Transition penalty depends only on the step length
    let penalty: Vec<f32> = (0..=max_back)
        .map(|d| {
            if d == 0 {
                f32::INFINITY
            } else {
                let x = (d as f32 / period_frames).ln();
                lambda * x * x
            }
        })
        .collect();

    let mut score = vec![0.0f32; n];
    let mut backlink: Vec<Option<usize>> = vec![None; n];

    for t in 0..n {
        suspend.checkpoint()?;
        let local = if envelope[t].is_finite() { envelope[t] } else { 0.0 };
        let mut best: Option<(usize, f32)> = None;
        if t >= min_back {
            let lo = t.saturating_sub(max_back);
            for tau in lo..=t - min_back {
                let candidate = score[tau] - penalty[t - tau];
                if best.is_none_or(|(_, s)| candidate > s) {
                    best = Some((tau, candidate));
                }
            }
        }
        match best {
            Some((tau, s)) if s >= 0.0 => {
                score[t] = local + s;
                backlink[t] = Some(tau);
            }
            _ => score[t] = local,
        }
    }

    let tail_start = n.saturating_sub(period_frames.round().max(1.0) as usize);
    let mut current = (tail_start..n)
        .max_by(|&a, &b| score[a].partial_cmp(&score[b]).unwrap_or(std::cmp::Ordering::Equal))
        .unwrap_or(n - 1);

    let mut beats = vec![current];
    while let Some(prev) = backlink[current] {
        beats.push(prev);
        current = prev;
    }
    beats.reverse();
    Ok(beats)
}

/// Tempo from the least-squares slope of beat times against beat index
///
/// Returns `None` with fewer than 3 beats.
pub fn regression_bpm(beat_times: &[f32]) -> Option<f32> {
    let n = beat_times.len();
    if n < 3 {
        return None;
    }
    let n_f = n as f64;
    let mean_x = (n_f - 1.0) / 2.0;
    let mean_y = beat_times.iter().map(|&t| t as f64).sum::<f64>() / n_f;
    let (mut sxy, mut sxx) = (0.0f64, 0.0f64);
    for (i, &t) in beat_times.iter().enumerate() {
        let dx = i as f64 - mean_x;
        sxy += dx * (t as f64 - mean_y);
        sxx += dx * dx;
    }
    let slope = sxy / sxx;
    if slope > 0.0 {
        Some((60.0 / slope) as f32)
    } else {
        None
    }
}
