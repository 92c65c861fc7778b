//! SQLite storage implementation

use std::path::Path;

use async_trait::async_trait;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::FaceError;

use super::traits::{
    embedding_to_bytes, AttendanceLog, AttendanceRecord, VectorRecord, VectorStore,
};

/// SQLite-based vector store
pub struct SqliteStore {
    pool: SqlitePool,
    dim: usize,
}

impl SqliteStore {
    /// Open (or create) a store at the given path holding vectors of
    /// dimension `dim`.
    pub async fn new(db_path: &str, dim: usize) -> Result<Self, FaceError> {
        // Ensure parent directory exists
        if let Some(parent) = Path::new(db_path).parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| FaceError::StorageUnavailable(e.to_string()))?;
        }

        let database_url = format!("sqlite:{}?mode=rwc", db_path);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&database_url)
            .await?;

        let store = Self { pool, dim };
        store.initialize().await?;

        Ok(store)
    }

    /// Initialize database schema
    async fn initialize(&self) -> Result<(), FaceError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS face_vectors (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                embedding BLOB NOT NULL,
                created_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_face_vectors_owner_id ON face_vectors(owner_id)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS attendance (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner_id TEXT NOT NULL,
                recorded_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_attendance_recorded_at ON attendance(recorded_at DESC)",
        )
        .execute(&self.pool)
        .await?;

        info!("SQLite vector store initialized");
        Ok(())
    }

    fn now() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64
    }

    fn row_to_record(row: &SqliteRow) -> VectorRecord {
        VectorRecord {
            id: row.get("id"),
            owner_id: row.get("owner_id"),
            embedding: row.get("embedding"),
            created_at: row.get("created_at"),
        }
    }
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn append(&self, owner_id: &str, vector: &[f32]) -> Result<String, FaceError> {
        if vector.len() != self.dim {
            return Err(FaceError::DimensionMismatch {
                expected: self.dim,
                actual: vector.len(),
            });
        }

        let id = Uuid::new_v4().to_string();
        let created_at = Self::now();

        sqlx::query(
            "INSERT INTO face_vectors (id, owner_id, embedding, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(owner_id)
        .bind(embedding_to_bytes(vector))
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        debug!("Appended vector {} for owner {}", id, owner_id);
        Ok(id)
    }

    async fn list_all(&self) -> Result<Vec<VectorRecord>, FaceError> {
        let rows = sqlx::query(
            r#"
            SELECT id, owner_id, embedding, created_at
            FROM face_vectors
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(Self::row_to_record).collect())
    }

    async fn delete(&self, id: &str) -> Result<bool, FaceError> {
        let result = sqlx::query("DELETE FROM face_vectors WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_owner(&self, owner_id: &str) -> Result<u64, FaceError> {
        let result = sqlx::query("DELETE FROM face_vectors WHERE owner_id = ?")
            .bind(owner_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl AttendanceLog for SqliteStore {
    async fn append_attendance(&self, owner_id: &str, recorded_at: i64) -> Result<(), FaceError> {
        sqlx::query("INSERT INTO attendance (owner_id, recorded_at) VALUES (?, ?)")
            .bind(owner_id)
            .bind(recorded_at)
            .execute(&self.pool)
            .await?;

        debug!("Recorded attendance for owner {}", owner_id);
        Ok(())
    }
}

impl SqliteStore {
    /// List vectors belonging to a single owner, newest first.
    pub async fn list_owner(&self, owner_id: &str) -> Result<Vec<VectorRecord>, FaceError> {
        let rows = sqlx::query(
            r#"
            SELECT id, owner_id, embedding, created_at
            FROM face_vectors
            WHERE owner_id = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(Self::row_to_record).collect())
    }

    /// Total stored vector count.
    pub async fn count_vectors(&self) -> Result<i64, FaceError> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM face_vectors")
            .fetch_one(&self.pool)
            .await?;

        Ok(row.get("count"))
    }

    /// Most recent attendance events, newest first.
    pub async fn list_attendance(&self, limit: i64) -> Result<Vec<AttendanceRecord>, FaceError> {
        let rows = sqlx::query(
            r#"
            SELECT id, owner_id, recorded_at
            FROM attendance
            ORDER BY recorded_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let records: Vec<AttendanceRecord> = rows
            .into_iter()
            .map(|row| AttendanceRecord {
                id: row.get("id"),
                owner_id: row.get("owner_id"),
                recorded_at: row.get("recorded_at"),
            })
            .collect();

        Ok(records)
    }
}
