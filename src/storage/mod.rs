//! Storage module for face vector persistence

pub mod sqlite;
pub mod traits;

pub use sqlite::SqliteStore;
pub use traits::{embedding_to_bytes, AttendanceLog, AttendanceRecord, VectorRecord, VectorStore};
