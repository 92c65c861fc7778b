//! Storage abstraction traits
//!
//! Defines the interface for face vector persistence. The snapshot cache
//! consumes [`VectorStore`]; the attendance worker consumes
//! [`AttendanceLog`]. This layer is dumb and durable: no in-process
//! caching happens here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::FaceError;

/// A stored face vector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    /// Unique vector ID (UUID)
    pub id: String,
    /// Owner ID, an opaque label managed by the external user store
    pub owner_id: String,
    /// Embedding as little-endian f32 bytes
    pub embedding: Vec<u8>,
    /// Creation timestamp (unix seconds)
    pub created_at: i64,
}

impl VectorRecord {
    /// Get embedding as float vector
    pub fn embedding_f32(&self) -> Vec<f32> {
        self.embedding
            .chunks_exact(4)
            .map(|chunk| {
                let arr: [u8; 4] = chunk.try_into().unwrap();
                f32::from_le_bytes(arr)
            })
            .collect()
    }
}

/// Encode an embedding into the persisted byte layout.
pub fn embedding_to_bytes(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// A recorded attendance event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: i64,
    pub owner_id: String,
    pub recorded_at: i64,
}

/// Face vector storage trait.
///
/// Implementations must be thread-safe. Vectors are immutable once
/// stored: there is no update, only delete and re-add.
#[async_trait]
pub trait VectorStore: Send + Sync + 'static {
    /// Append a new vector for an owner, returning the generated ID.
    /// Fails with `DimensionMismatch` when the vector does not have the
    /// configured dimension.
    async fn append(&self, owner_id: &str, vector: &[f32]) -> Result<String, FaceError>;

    /// Full scan of every stored vector.
    ///
    /// The order is stable (creation time, then ID) but carries no
    /// semantic meaning; callers must not rely on it to rank owners.
    async fn list_all(&self) -> Result<Vec<VectorRecord>, FaceError>;

    /// Delete a vector by ID. Deleting a missing ID is not an error.
    async fn delete(&self, id: &str) -> Result<bool, FaceError>;

    /// Delete every vector belonging to an owner, returning the count.
    async fn delete_owner(&self, owner_id: &str) -> Result<u64, FaceError>;
}

/// Sink-side persistence for attendance events
#[async_trait]
pub trait AttendanceLog: Send + Sync + 'static {
    async fn append_attendance(&self, owner_id: &str, recorded_at: i64) -> Result<(), FaceError>;
}
