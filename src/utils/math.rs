//! Math utility functions

/// Cosine distance between two vectors: `1 - cosine similarity`.
///
/// 0 means identical direction, larger means more dissimilar. Returns
/// `None` when the lengths differ or either vector has zero norm; such a
/// distance is undefined and callers must never treat it as a candidate.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a > 0.0 && norm_b > 0.0 {
        Some(1.0 - dot / (norm_a * norm_b))
    } else {
        None
    }
}
