//! Recognition service - core business logic
//!
//! Wires the vector store, snapshot cache, matcher and attendance sink
//! into the enroll / remove / recognize operations exposed to the
//! request-handling layer.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::info;

use crate::attendance::AttendanceSink;
use crate::cache::VectorCache;
use crate::config::Config;
use crate::error::FaceError;
use crate::matcher::{confidence, Matcher};
use crate::storage::VectorStore;

use super::types::*;

/// Face recognition service
pub struct RecognitionService<S: VectorStore> {
    store: Arc<S>,
    cache: VectorCache<S>,
    matcher: Matcher,
    sink: AttendanceSink,
    config: Config,
}

impl<S: VectorStore> RecognitionService<S> {
    /// Create a new recognition service. The sink is built by the caller
    /// so its log target can differ from the vector store.
    pub fn new(store: Arc<S>, sink: AttendanceSink, config: Config) -> Self {
        let cache = VectorCache::new(store.clone(), Duration::from_secs(config.cache.ttl_secs));
        let matcher = Matcher::new(config.recognition.embedding_dim);

        Self {
            store,
            cache,
            matcher,
            sink,
            config,
        }
    }

    /// Get a reference to the store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    fn check_dim(&self, vector: &[f32]) -> Result<(), FaceError> {
        let expected = self.config.recognition.embedding_dim;
        if vector.len() != expected {
            return Err(FaceError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }
        Ok(())
    }

    /// Enroll a vector for an owner, returning the new vector ID.
    ///
    /// The cache is invalidated only after the store write has committed,
    /// so a crash in between leaves at worst a TTL-bounded stale window.
    pub async fn enroll(&self, owner_id: &str, vector: &[f32]) -> Result<String, FaceError> {
        self.check_dim(vector)?;

        let id = self.store.append(owner_id, vector).await?;
        self.cache.invalidate();

        info!("Enrolled vector {} for owner {}", id, owner_id);
        Ok(id)
    }

    /// Remove a single vector by ID.
    pub async fn remove_vector(&self, id: &str) -> Result<bool, FaceError> {
        let deleted = self.store.delete(id).await?;
        self.cache.invalidate();
        Ok(deleted)
    }

    /// Remove every vector enrolled for an owner.
    pub async fn remove_owner(&self, owner_id: &str) -> Result<u64, FaceError> {
        let removed = self.store.delete_owner(owner_id).await?;
        self.cache.invalidate();
        Ok(removed)
    }

    /// Recognize a query vector against the enrolled set.
    ///
    /// `threshold` overrides the configured maximum cosine distance. On a
    /// match the attendance sink is notified off the request path; a sink
    /// failure can never fail this call.
    pub async fn recognize(
        &self,
        vector: &[f32],
        threshold: Option<f32>,
    ) -> Result<Recognition, FaceError> {
        let start = Instant::now();
        self.check_dim(vector)?;

        let threshold = threshold.unwrap_or(self.config.recognition.match_threshold);
        let read = self.cache.snapshot().await?;

        let outcome = match self.matcher.find(vector, &read.snapshot, threshold)? {
            Some(hit) => {
                self.sink.record(&hit.owner_id);
                info!(
                    "Recognized owner {} at distance {:.4}",
                    hit.owner_id, hit.distance
                );
                RecognizeOutcome::Match {
                    owner_id: hit.owner_id,
                    vector_id: hit.vector_id,
                    confidence: confidence(hit.distance),
                }
            }
            None => RecognizeOutcome::NoMatch,
        };

        Ok(Recognition {
            outcome,
            degraded: read.degraded,
            match_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}
