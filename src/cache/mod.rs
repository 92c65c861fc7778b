//! Refreshable snapshot cache over the vector store
//!
//! Holds a versioned, point-in-time copy of every stored vector so the
//! match path never touches storage while the snapshot is fresh.
//! Refreshes are single-flight: concurrent callers that find the
//! snapshot stale share one `list_all` scan and receive the same
//! published snapshot.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::FaceError;
use crate::storage::{VectorRecord, VectorStore};

/// One cached vector, decoded for matching.
#[derive(Debug, Clone)]
pub struct SnapshotEntry {
    pub id: String,
    pub owner_id: String,
    pub embedding: Vec<f32>,
    pub created_at: i64,
}

/// Immutable point-in-time view of the stored vector set.
#[derive(Debug)]
pub struct Snapshot {
    pub version: u64,
    /// Capture timestamp (unix seconds)
    pub captured_at: i64,
    /// Entries in store scan order: stable, not semantically meaningful.
    pub entries: Vec<SnapshotEntry>,
}

impl Snapshot {
    fn from_records(version: u64, records: Vec<VectorRecord>) -> Self {
        let entries = records
            .into_iter()
            .map(|r| {
                let embedding = r.embedding_f32();
                SnapshotEntry {
                    id: r.id,
                    owner_id: r.owner_id,
                    embedding,
                    created_at: r.created_at,
                }
            })
            .collect();

        let captured_at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs() as i64;

        Self {
            version,
            captured_at,
            entries,
        }
    }
}

/// A snapshot handed to a caller. `degraded` is set when the latest
/// refresh attempt failed and this is stale-but-present data.
#[derive(Debug, Clone)]
pub struct CacheRead {
    pub snapshot: Arc<Snapshot>,
    pub degraded: bool,
}

type RefreshResult = Result<Arc<Snapshot>, FaceError>;

struct CacheState {
    current: Option<Arc<Snapshot>>,
    refreshed_at: Option<Instant>,
    stale: bool,
    /// Bumped by `invalidate`; a refresh only clears `stale` when no
    /// invalidation landed while its scan was running.
    epoch: u64,
    refresh: Option<watch::Receiver<Option<RefreshResult>>>,
}

struct Inner<S> {
    store: Arc<S>,
    ttl: Duration,
    state: Mutex<CacheState>,
}

/// Versioned snapshot cache with TTL expiry and explicit invalidation.
pub struct VectorCache<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for VectorCache<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S: VectorStore> VectorCache<S> {
    pub fn new(store: Arc<S>, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                ttl,
                state: Mutex::new(CacheState {
                    current: None,
                    refreshed_at: None,
                    stale: true,
                    epoch: 0,
                    refresh: None,
                }),
            }),
        }
    }

    /// Current snapshot, refreshing first when stale or expired.
    ///
    /// Concurrent callers collapse into a single storage scan. When a
    /// refresh fails but an older snapshot exists, that snapshot is
    /// returned with `degraded` set and the cache stays stale so the
    /// next call retries. Fails with `StorageUnavailable` only when no
    /// snapshot has ever been loaded.
    pub async fn snapshot(&self) -> Result<CacheRead, FaceError> {
        let mut rx = {
            let mut st = self.inner.state.lock().unwrap();

            if let (Some(snap), Some(at)) = (st.current.as_ref(), st.refreshed_at) {
                if !st.stale && at.elapsed() < self.inner.ttl {
                    return Ok(CacheRead {
                        snapshot: snap.clone(),
                        degraded: false,
                    });
                }
            }

            match st.refresh.clone() {
                Some(rx) => rx,
                None => {
                    let (tx, rx) = watch::channel(None);
                    st.refresh = Some(rx.clone());
                    let inner = self.inner.clone();
                    let started_epoch = st.epoch;
                    // The refresh runs detached: a caller abandoning its
                    // wait must not cancel the scan, which always
                    // completes and publishes for future callers.
                    tokio::spawn(async move {
                        Inner::run_refresh(inner, tx, started_epoch).await;
                    });
                    rx
                }
            }
        };

        let received = rx
            .wait_for(|value| value.is_some())
            .await
            .map(|value| (*value).clone())
            .unwrap_or(None);

        let outcome = received.unwrap_or_else(|| {
            Err(FaceError::StorageUnavailable(
                "cache refresh task dropped".to_string(),
            ))
        });

        match outcome {
            Ok(snapshot) => Ok(CacheRead {
                snapshot,
                degraded: false,
            }),
            Err(e) => {
                let st = self.inner.state.lock().unwrap();
                match st.current.as_ref() {
                    Some(snap) => Ok(CacheRead {
                        snapshot: snap.clone(),
                        degraded: true,
                    }),
                    None => Err(e),
                }
            }
        }
    }

    /// Mark the snapshot stale. The next `snapshot()` call refreshes
    /// lazily; nothing is read here. Writers call this only after the
    /// corresponding store write has durably committed.
    pub fn invalidate(&self) {
        let mut st = self.inner.state.lock().unwrap();
        st.stale = true;
        st.epoch += 1;
    }
}

impl<S: VectorStore> Inner<S> {
    async fn run_refresh(
        inner: Arc<Inner<S>>,
        tx: watch::Sender<Option<RefreshResult>>,
        started_epoch: u64,
    ) {
        let result = inner.store.list_all().await;

        let outcome = {
            let mut st = inner.state.lock().unwrap();
            st.refresh = None;
            match result {
                Ok(records) => {
                    let version = st.current.as_ref().map_or(1, |s| s.version + 1);
                    let snapshot = Arc::new(Snapshot::from_records(version, records));
                    st.current = Some(snapshot.clone());
                    st.refreshed_at = Some(Instant::now());
                    // An invalidation that landed mid-scan keeps the
                    // cache stale.
                    st.stale = st.epoch != started_epoch;
                    debug!(
                        "Published snapshot v{} with {} entries",
                        snapshot.version,
                        snapshot.entries.len()
                    );
                    Ok(snapshot)
                }
                Err(e) => {
                    st.stale = true;
                    warn!("Snapshot refresh failed: {}", e);
                    Err(e)
                }
            }
        };

        let _ = tx.send(Some(outcome));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::embedding_to_bytes;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct StubStore {
        records: Mutex<Vec<VectorRecord>>,
        list_calls: AtomicUsize,
        delay: Duration,
        fail: AtomicBool,
    }

    impl StubStore {
        fn new(delay: Duration) -> Self {
            Self {
                records: Mutex::new(Vec::new()),
                list_calls: AtomicUsize::new(0),
                delay,
                fail: AtomicBool::new(false),
            }
        }

        fn push(&self, id: &str, owner_id: &str, vector: &[f32]) {
            self.records.lock().unwrap().push(VectorRecord {
                id: id.to_string(),
                owner_id: owner_id.to_string(),
                embedding: embedding_to_bytes(vector),
                created_at: 0,
            });
        }
    }

    #[async_trait]
    impl VectorStore for StubStore {
        async fn append(&self, owner_id: &str, vector: &[f32]) -> Result<String, FaceError> {
            let id = format!("stub-{}", self.records.lock().unwrap().len());
            self.push(&id, owner_id, vector);
            Ok(id)
        }

        async fn list_all(&self) -> Result<Vec<VectorRecord>, FaceError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            // Point-in-time view as of scan start
            let records = self.records.lock().unwrap().clone();
            if self.delay > Duration::ZERO {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(FaceError::StorageUnavailable("stub store down".to_string()));
            }
            Ok(records)
        }

        async fn delete(&self, id: &str) -> Result<bool, FaceError> {
            let mut records = self.records.lock().unwrap();
            let before = records.len();
            records.retain(|r| r.id != id);
            Ok(records.len() < before)
        }

        async fn delete_owner(&self, owner_id: &str) -> Result<u64, FaceError> {
            let mut records = self.records.lock().unwrap();
            let before = records.len();
            records.retain(|r| r.owner_id != owner_id);
            Ok((before - records.len()) as u64)
        }
    }

    fn cache_over(store: Arc<StubStore>, ttl_secs: u64) -> VectorCache<StubStore> {
        VectorCache::new(store, Duration::from_secs(ttl_secs))
    }

    #[tokio::test]
    async fn test_fresh_snapshot_skips_storage() {
        let store = Arc::new(StubStore::new(Duration::ZERO));
        store.push("v1", "owner-a", &[1.0, 0.0]);
        let cache = cache_over(store.clone(), 60);

        let first = cache.snapshot().await.unwrap();
        let second = cache.snapshot().await.unwrap();

        assert_eq!(store.list_calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.snapshot.version, second.snapshot.version);
        assert_eq!(second.snapshot.entries.len(), 1);
        assert!(!second.degraded);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_refresh() {
        let store = Arc::new(StubStore::new(Duration::from_millis(150)));
        store.push("v1", "owner-a", &[1.0, 0.0]);
        let cache = Arc::new(cache_over(store.clone(), 60));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move { cache.snapshot().await }));
        }

        let mut versions = Vec::new();
        for handle in handles {
            let read = handle.await.unwrap().unwrap();
            versions.push(read.snapshot.version);
        }

        assert_eq!(store.list_calls.load(Ordering::SeqCst), 1);
        assert!(versions.iter().all(|v| *v == versions[0]));
    }

    #[tokio::test]
    async fn test_invalidate_is_visible_before_ttl_expiry() {
        let store = Arc::new(StubStore::new(Duration::ZERO));
        store.push("v1", "owner-a", &[1.0, 0.0]);
        let cache = cache_over(store.clone(), 3600);

        assert_eq!(cache.snapshot().await.unwrap().snapshot.entries.len(), 1);

        // A new enrollment commits, then invalidates
        store.push("v2", "owner-b", &[0.0, 1.0]);
        assert_eq!(cache.snapshot().await.unwrap().snapshot.entries.len(), 1);
        cache.invalidate();

        let read = cache.snapshot().await.unwrap();
        assert_eq!(read.snapshot.entries.len(), 2);
        assert_eq!(read.snapshot.version, 2);
        assert_eq!(store.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_serves_last_good_snapshot_degraded() {
        let store = Arc::new(StubStore::new(Duration::ZERO));
        store.push("v1", "owner-a", &[1.0, 0.0]);
        let cache = cache_over(store.clone(), 3600);

        let good = cache.snapshot().await.unwrap();
        assert!(!good.degraded);

        store.fail.store(true, Ordering::SeqCst);
        cache.invalidate();

        let degraded = cache.snapshot().await.unwrap();
        assert!(degraded.degraded);
        assert_eq!(degraded.snapshot.version, good.snapshot.version);

        // Store recovers: the cache stayed stale and retries
        store.fail.store(false, Ordering::SeqCst);
        let recovered = cache.snapshot().await.unwrap();
        assert!(!recovered.degraded);
        assert_eq!(recovered.snapshot.version, good.snapshot.version + 1);
    }

    #[tokio::test]
    async fn test_refresh_failure_without_any_snapshot_errors() {
        let store = Arc::new(StubStore::new(Duration::ZERO));
        store.fail.store(true, Ordering::SeqCst);
        let cache = cache_over(store.clone(), 60);

        let err = cache.snapshot().await.unwrap_err();
        assert!(matches!(err, FaceError::StorageUnavailable(_)));
    }

    #[tokio::test]
    async fn test_abandoned_waiter_does_not_cancel_refresh() {
        let store = Arc::new(StubStore::new(Duration::from_millis(100)));
        store.push("v1", "owner-a", &[1.0, 0.0]);
        let cache = cache_over(store.clone(), 3600);

        // The waiter gives up, the scan keeps running
        let abandoned =
            tokio::time::timeout(Duration::from_millis(10), cache.snapshot()).await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(200)).await;

        // The refresh published; this call is a plain cache hit
        let read = cache.snapshot().await.unwrap();
        assert_eq!(read.snapshot.version, 1);
        assert_eq!(store.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalidate_during_refresh_keeps_cache_stale() {
        let store = Arc::new(StubStore::new(Duration::from_millis(100)));
        store.push("v1", "owner-a", &[1.0, 0.0]);
        let cache = Arc::new(cache_over(store.clone(), 3600));

        let waiter = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.snapshot().await })
        };

        // Land an invalidation while the scan is in flight
        tokio::time::sleep(Duration::from_millis(30)).await;
        store.push("v2", "owner-b", &[0.0, 1.0]);
        cache.invalidate();

        let read = waiter.await.unwrap().unwrap();
        assert_eq!(read.snapshot.version, 1);
        assert_eq!(read.snapshot.entries.len(), 1);

        // The completed refresh did not mark the cache fresh; the next
        // call rescans and sees the new vector
        let next = cache.snapshot().await.unwrap();
        assert_eq!(next.snapshot.version, 2);
        assert_eq!(next.snapshot.entries.len(), 2);
    }
}
