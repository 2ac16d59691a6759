//! Chroma normalisation and similarity

use super::Chroma;

/// Total energy below which a chroma frame counts as silent
pub const SILENT_FRAME_ENERGY: f32 = 1e-7;

/// Scale a chroma vector so its largest element is 1
///
/// Silent or non-finite vectors are zeroed and `false` is returned.
pub fn normalise_max(chroma: &mut Chroma) -> bool {
    let mut sum = 0.0f32;
    let mut max = 0.0f32;
    for v in chroma.iter_mut() {
        if !v.is_finite() || *v < 0.0 {
            *v = 0.0;
        }
        sum += *v;
        max = max.max(*v);
    }
    if sum < SILENT_FRAME_ENERGY || max <= 0.0 {
        chroma.fill(0.0);
        return false;
    }
    for v in chroma.iter_mut() {
        *v /= max;
    }
    true
}

/// Euclidean norm
pub fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity of two vectors of equal length
///
/// Returns 0.0 when either vector has zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let na = l2_norm(a);
    let nb = l2_norm(b);
    if na <= f32::EPSILON || nb <= f32::EPSILON {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    (dot / (na * nb)).clamp(-1.0, 1.0)
}
