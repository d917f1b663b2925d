//! Thumbnail byte cache.

use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::AsyncCommands;
use std::time::Duration;
use uuid::Uuid;

use crate::lock::LockGuard;
use crate::{scripts, CacheError, CacheResult};
use pixed_core::constants::THUMB_CACHE_TTL;

/// Reconnect backoff multiplier in milliseconds.
const RECONNECT_FACTOR_MS: u64 = 100;
/// Backoff is capped at 3 seconds.
const RECONNECT_MAX_DELAY_MS: u64 = 3_000;
/// After this many failed reconnects an operation surfaces `CacheError`.
const RECONNECT_RETRIES: usize = 10;

fn thumb_key(image_id: Uuid) -> String {
    format!("thumb:{image_id}")
}

fn lock_key(name: &str) -> String {
    format!("lock:{name}")
}

/// Shared Redis client: one multiplexed connection, auto-reconnecting.
#[derive(Clone)]
pub struct Cache {
    conn: ConnectionManager,
}

impl Cache {
    pub async fn connect(redis_url: &str) -> CacheResult<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        let config = ConnectionManagerConfig::new()
            .set_factor(RECONNECT_FACTOR_MS)
            .set_max_delay(RECONNECT_MAX_DELAY_MS)
            .set_number_of_retries(RECONNECT_RETRIES);

        let conn = client
            .get_connection_manager_with_config(config)
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        Ok(Cache { conn })
    }

    pub async fn get_thumb(&self, image_id: Uuid) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let bytes: Option<Vec<u8>> = conn.get(thumb_key(image_id)).await?;
        Ok(bytes)
    }

    pub async fn set_thumb(&self, image_id: Uuid, bytes: &[u8]) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(thumb_key(image_id), bytes, THUMB_CACHE_TTL.as_secs())
            .await?;
        Ok(())
    }

    pub async fn invalidate_thumb(&self, image_id: Uuid) -> CacheResult<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(thumb_key(image_id)).await?;
        Ok(())
    }

    /// Atomic set-if-absent with TTL. Returns a guard when acquired, None
    /// when another holder has the lock.
    pub async fn try_acquire_lock(
        &self,
        name: &str,
        ttl: Duration,
    ) -> CacheResult<Option<LockGuard>> {
        let key = lock_key(name);
        let owner = Uuid::new_v4().to_string();
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);

        let mut conn = self.conn.clone();
        let acquired: i64 = redis::Script::new(scripts::LOCK_ACQUIRE)
            .key(&key)
            .arg(&owner)
            .arg(ttl_ms)
            .invoke_async(&mut conn)
            .await?;

        if acquired == 1 {
            Ok(Some(LockGuard::new(self.conn.clone(), key, owner)))
        } else {
            Ok(None)
        }
    }

    /// Poll [`Self::try_acquire_lock`] until acquired or the timeout lapses.
    pub async fn acquire_lock(
        &self,
        name: &str,
        ttl: Duration,
        timeout: Duration,
    ) -> CacheResult<LockGuard> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if let Some(guard) = self.try_acquire_lock(name, ttl).await? {
                return Ok(guard);
            }
            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Err(CacheError::LockTimeout(timeout));
            }
            let sleep_dur = crate::LOCK_POLL_INTERVAL.min(deadline - now);
            tokio::time::sleep(sleep_dur).await;
        }
    }

    /// Run `f` under the named lock, releasing it on all exit paths. The
    /// TTL bounds how long a crashed holder can block others.
    pub async fn with_lock<T, E, F, Fut>(
        &self,
        name: &str,
        ttl: Duration,
        timeout: Duration,
        f: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
        E: From<CacheError>,
    {
        let guard = self.acquire_lock(name, ttl, timeout).await?;
        let result = f().await;
        guard.release().await;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// These tests need a live Redis; they skip themselves when REDIS_URL
    /// is not set.
    async fn test_cache() -> Option<Cache> {
        let url = std::env::var("REDIS_URL").ok()?;
        Cache::connect(&url).await.ok()
    }

    #[tokio::test]
    async fn test_thumb_round_trip() {
        let Some(cache) = test_cache().await else {
            eprintln!("skipping: REDIS_URL not set");
            return;
        };

        let id = Uuid::new_v4();
        assert_eq!(cache.get_thumb(id).await.unwrap(), None);

        cache.set_thumb(id, b"webp-bytes").await.unwrap();
        assert_eq!(
            cache.get_thumb(id).await.unwrap().as_deref(),
            Some(b"webp-bytes".as_slice())
        );

        cache.invalidate_thumb(id).await.unwrap();
        assert_eq!(cache.get_thumb(id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_lock_mutual_exclusion() {
        let Some(cache) = test_cache().await else {
            eprintln!("skipping: REDIS_URL not set");
            return;
        };

        let name = format!("test-{}", Uuid::new_v4());
        let guard = cache
            .try_acquire_lock(&name, Duration::from_secs(5))
            .await
            .unwrap()
            .expect("first acquire succeeds");

        // Second acquire of a held lock fails fast.
        assert!(cache
            .try_acquire_lock(&name, Duration::from_secs(5))
            .await
            .unwrap()
            .is_none());

        guard.release().await;
        assert!(cache
            .try_acquire_lock(&name, Duration::from_secs(5))
            .await
            .unwrap()
            .is_some());
    }
}
