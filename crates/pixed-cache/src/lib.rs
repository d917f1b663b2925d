//! Redis cache layer.
//!
//! Two concerns share one client: thumbnail bytes keyed by image id, and a
//! general-purpose distributed lock built on `SET NX PX` with
//! owner-checked release. The cache is a performance layer only -
//! correctness never depends on a hit, and invalidation is best-effort.
//!
//! The client is a single multiplexed connection that reconnects with
//! exponential backoff (capped at 3 seconds, at most 10 attempts before
//! operations surface [`CacheError`]).

pub mod lock;
mod scripts;
pub mod thumbs;

pub use lock::{LockGuard, LOCK_POLL_INTERVAL};
pub use thumbs::Cache;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Lock acquisition timed out after {0:?}")]
    LockTimeout(std::time::Duration),
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_refusal() || err.is_connection_dropped() || err.is_timeout() {
            CacheError::Connection(err.to_string())
        } else {
            CacheError::Backend(err.to_string())
        }
    }
}

impl From<CacheError> for pixed_core::AppError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::LockTimeout(_) => pixed_core::AppError::Concurrency(err.to_string()),
            other => pixed_core::AppError::Cache(other.to_string()),
        }
    }
}

pub type CacheResult<T> = Result<T, CacheError>;
