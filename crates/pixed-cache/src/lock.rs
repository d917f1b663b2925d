//! Distributed lock guard.
//!
//! Mutual exclusion via `SET NX PX`: acquisition writes a random owner
//! token, release deletes the key only when the token still matches, so an
//! expired-and-reacquired lock is never released by the stale holder.
//! Single-instance Redis gives full mutual exclusion; failover deployments
//! weaken this, which is acceptable for the thumbnail derivation work the
//! lock coordinates.

use redis::aio::ConnectionManager;
use std::time::Duration;

use crate::scripts;

/// Retry interval when polling for lock acquisition.
pub const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// A held distributed lock.
///
/// Dropping the guard without calling [`release`](LockGuard::release) is
/// safe; the lock expires after its TTL. Explicit release is preferred for
/// prompt handover.
pub struct LockGuard {
    conn: ConnectionManager,
    key: String,
    owner: String,
}

impl LockGuard {
    pub(crate) fn new(conn: ConnectionManager, key: String, owner: String) -> Self {
        Self { conn, key, owner }
    }

    /// Release the lock if this guard still owns it. Failures only delay
    /// handover until the TTL expires, so they are logged and swallowed.
    pub async fn release(mut self) {
        let released: Result<i64, redis::RedisError> = redis::Script::new(scripts::LOCK_RELEASE)
            .key(&self.key)
            .arg(&self.owner)
            .invoke_async(&mut self.conn)
            .await;

        match released {
            Ok(1) => {}
            Ok(_) => {
                tracing::debug!(key = %self.key, "Lock already expired at release time");
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "Failed to release lock");
            }
        }
    }
}
