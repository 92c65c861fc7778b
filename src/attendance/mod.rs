//! Best-effort attendance recording
//!
//! Successful matches are recorded off the request path: [`AttendanceSink::record`]
//! enqueues on a bounded channel and returns immediately, while a worker
//! task drains the queue and writes through an [`AttendanceLog`]. Write
//! failures are logged and the event dropped after a bounded number of
//! attempts; they can never fail a recognition call.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::config::AttendanceConfig;
use crate::storage::AttendanceLog;

/// A pending attendance event
#[derive(Debug, Clone)]
pub struct AttendanceEvent {
    pub owner_id: String,
    pub recorded_at: i64,
}

/// Handle for enqueueing attendance events.
#[derive(Clone)]
pub struct AttendanceSink {
    tx: mpsc::Sender<AttendanceEvent>,
}

impl AttendanceSink {
    /// Spawn the worker task and return the sink handle. The worker stops
    /// once every handle is dropped and the queue drains.
    pub fn spawn<L: AttendanceLog>(log: Arc<L>, config: &AttendanceConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity);
        tokio::spawn(run_worker(
            log,
            rx,
            config.max_write_attempts,
            config.retry_delay_ms,
        ));
        Self { tx }
    }

    /// Enqueue an attendance event for an owner. Never blocks; when the
    /// queue is full the event is dropped with a warning.
    pub fn record(&self, owner_id: &str) {
        let event = AttendanceEvent {
            owner_id: owner_id.to_string(),
            recorded_at: unix_now(),
        };

        if self.tx.try_send(event).is_err() {
            warn!("Attendance queue full, dropping event for owner {}", owner_id);
        }
    }
}

fn unix_now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

async fn run_worker<L: AttendanceLog>(
    log: Arc<L>,
    mut rx: mpsc::Receiver<AttendanceEvent>,
    max_attempts: u32,
    retry_delay_ms: u64,
) {
    while let Some(event) = rx.recv().await {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match log.append_attendance(&event.owner_id, event.recorded_at).await {
                Ok(()) => break,
                Err(e) if attempt < max_attempts => {
                    warn!("Attendance write failed (attempt {}): {}", attempt, e);
                    tokio::time::sleep(Duration::from_millis(retry_delay_ms)).await;
                }
                Err(e) => {
                    error!(
                        "Dropping attendance event for owner {} after {} attempts: {}",
                        event.owner_id, attempt, e
                    );
                    break;
                }
            }
        }
    }
    debug!("Attendance worker stopped");
}
