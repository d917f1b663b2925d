//! Age-based bucket lifecycle for local-filesystem mode.
//!
//! On GCS the one-day deletion policy is configured on the buckets
//! themselves. The local backend has no such machinery, so this sweeper
//! walks the bucket directories on an interval and removes files older
//! than the lifecycle TTL. Correctness never depends on it: expired blobs
//! are orphan cost, not corruption, and signed URLs are clamped to the
//! same TTL.

use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::fs;
use tokio::time::interval;

use crate::local::LocalObjectStore;
use crate::traits::{Bucket, StorageError};
use pixed_core::constants::BUCKET_LIFECYCLE;

const SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

#[derive(Clone)]
pub struct LifecycleSweeper {
    store: Arc<LocalObjectStore>,
    max_age: Duration,
}

impl LifecycleSweeper {
    pub fn new(store: Arc<LocalObjectStore>) -> Self {
        Self {
            store,
            max_age: BUCKET_LIFECYCLE,
        }
    }

    #[cfg(test)]
    fn with_max_age(store: Arc<LocalObjectStore>, max_age: Duration) -> Self {
        Self { store, max_age }
    }

    /// Start the background sweep task. Returns a JoinHandle for graceful
    /// shutdown.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut tick = interval(SWEEP_INTERVAL);
            loop {
                tick.tick().await;
                match self.sweep_once().await {
                    Ok(removed) if removed > 0 => {
                        tracing::info!(removed, "Lifecycle sweep removed expired objects");
                    }
                    Ok(_) => {}
                    Err(e) => tracing::error!(error = %e, "Lifecycle sweep failed"),
                }
            }
        })
    }

    /// Remove every file older than the lifecycle TTL. Returns how many
    /// were deleted.
    pub async fn sweep_once(&self) -> Result<usize, StorageError> {
        let cutoff = SystemTime::now() - self.max_age;
        let mut removed = 0usize;

        for bucket in [Bucket::Raw, Bucket::Results, Bucket::Thumb] {
            let root = self.store.base_path().join(bucket.as_str());
            let mut pending = vec![root];

            while let Some(dir) = pending.pop() {
                let mut entries = match fs::read_dir(&dir).await {
                    Ok(entries) => entries,
                    Err(e) => {
                        tracing::warn!(dir = %dir.display(), error = %e, "Sweep skipped directory");
                        continue;
                    }
                };

                while let Some(entry) = entries.next_entry().await? {
                    let path = entry.path();
                    let meta = match entry.metadata().await {
                        Ok(meta) => meta,
                        Err(_) => continue,
                    };
                    if meta.is_dir() {
                        pending.push(path);
                        continue;
                    }
                    let expired = meta
                        .modified()
                        .map(|mtime| mtime < cutoff)
                        .unwrap_or(false);
                    if expired && fs::remove_file(&path).await.is_ok() {
                        removed += 1;
                    }
                }
            }
        }

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ObjectStore;
    use bytes::Bytes;

    #[tokio::test]
    async fn test_sweep_removes_only_expired() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(
            LocalObjectStore::new(dir.path(), "http://localhost/files".to_string())
                .await
                .unwrap(),
        );

        store
            .put(Bucket::Results, "old.jpg", Bytes::from_static(b"a"), "image/jpeg")
            .await
            .unwrap();
        store
            .put(Bucket::Results, "fresh.jpg", Bytes::from_static(b"b"), "image/jpeg")
            .await
            .unwrap();

        // Zero max age expires everything written so far.
        let sweeper = LifecycleSweeper::with_max_age(store.clone(), Duration::ZERO);
        tokio::time::sleep(Duration::from_millis(20)).await;
        let removed = sweeper.sweep_once().await.unwrap();
        assert_eq!(removed, 2);
        assert!(!store.exists(Bucket::Results, "old.jpg").await.unwrap());

        // A generous max age removes nothing.
        store
            .put(Bucket::Results, "kept.jpg", Bytes::from_static(b"c"), "image/jpeg")
            .await
            .unwrap();
        let sweeper = LifecycleSweeper::with_max_age(store.clone(), Duration::from_secs(3600));
        assert_eq!(sweeper.sweep_once().await.unwrap(), 0);
        assert!(store.exists(Bucket::Results, "kept.jpg").await.unwrap());
    }
}
