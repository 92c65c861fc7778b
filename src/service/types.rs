//! Service layer types

use serde::{Deserialize, Serialize};

/// Outcome of a recognition request. `NoMatch` is a normal outcome, not
/// an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RecognizeOutcome {
    Match {
        owner_id: String,
        vector_id: String,
        /// `1 - cosine distance`, clamped to `[0, 1]`
        confidence: f32,
    },
    NoMatch,
}

/// Recognition result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recognition {
    pub outcome: RecognizeOutcome,
    /// Set when the answer was computed from a stale snapshot because the
    /// backing store was unavailable at refresh time.
    pub degraded: bool,
    pub match_time_ms: u64,
}

impl Recognition {
    pub fn is_match(&self) -> bool {
        matches!(self.outcome, RecognizeOutcome::Match { .. })
    }
}
