//! Nearest-neighbor matching over a snapshot
//!
//! Pure linear scan by cosine distance, `O(N * D)` per query. No index:
//! at tens to low thousands of enrolled vectors a full scan is cheaper
//! than maintaining one, and the contract leaves room to swap in an
//! approximate index later without changing callers.

use crate::cache::Snapshot;
use crate::error::FaceError;
use crate::utils::math::cosine_distance;

/// Best match for a query vector
#[derive(Debug, Clone, PartialEq)]
pub struct MatchHit {
    pub vector_id: String,
    pub owner_id: String,
    pub distance: f32,
}

/// Confidence reported to callers: `1 - distance`, clamped to `[0, 1]`.
pub fn confidence(distance: f32) -> f32 {
    (1.0 - distance).clamp(0.0, 1.0)
}

/// Cosine nearest-neighbor matcher for dimension-`dim` embeddings.
#[derive(Debug, Clone)]
pub struct Matcher {
    dim: usize,
}

impl Matcher {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    /// Scan the snapshot for the entry closest to `query`.
    ///
    /// Returns `Ok(None)` when the snapshot is empty or the best distance
    /// exceeds `threshold`. Entries with an undefined distance (zero
    /// norm) are never selected. Ties keep the first entry in snapshot
    /// order; that order is stable but not semantically meaningful.
    pub fn find(
        &self,
        query: &[f32],
        snapshot: &Snapshot,
        threshold: f32,
    ) -> Result<Option<MatchHit>, FaceError> {
        if query.len() != self.dim {
            return Err(FaceError::DimensionMismatch {
                expected: self.dim,
                actual: query.len(),
            });
        }

        let mut best: Option<(usize, f32)> = None;

        for (idx, entry) in snapshot.entries.iter().enumerate() {
            let Some(distance) = cosine_distance(query, &entry.embedding) else {
                continue;
            };

            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((idx, distance));
            }
        }

        Ok(best
            .filter(|(_, distance)| *distance <= threshold)
            .map(|(idx, distance)| {
                let entry = &snapshot.entries[idx];
                MatchHit {
                    vector_id: entry.id.clone(),
                    owner_id: entry.owner_id.clone(),
                    distance,
                }
            }))
    }
}
