//! Recognition core configuration

use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub recognition: RecognitionConfig,
    pub cache: CacheConfig,
    pub attendance: AttendanceConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecognitionConfig {
    /// Embedding dimension D, fixed by the upstream feature extractor.
    pub embedding_dim: usize,
    /// Maximum cosine distance a match may have.
    pub match_threshold: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Seconds a snapshot stays fresh without an explicit invalidation.
    pub ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttendanceConfig {
    pub queue_capacity: usize,
    pub max_write_attempts: u32,
    pub retry_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub sqlite_path: PathBuf,
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn default_path() -> &'static str {
        "config.toml"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            recognition: RecognitionConfig {
                embedding_dim: 512,
                match_threshold: 0.6,
            },
            cache: CacheConfig { ttl_secs: 60 },
            attendance: AttendanceConfig {
                queue_capacity: 256,
                max_write_attempts: 3,
                retry_delay_ms: 200,
            },
            storage: StorageConfig {
                sqlite_path: PathBuf::from("data/attendance.db"),
            },
        }
    }
}
