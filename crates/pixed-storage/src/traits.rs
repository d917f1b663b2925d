//! Storage abstraction trait
//!
//! Defines the [`ObjectStore`] trait that all storage backends implement,
//! so the services work with any backend without coupling to SDK details.

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::paths;
use pixed_core::constants::BUCKET_LIFECYCLE;

/// The three logical storage namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    /// Uploaded originals, keyed `<owner>/<imageId>.<ext>`.
    Raw,
    /// Revision outputs, keyed `<imageId>_<revisionId>.<ext>`.
    Results,
    /// Derived previews, keyed `<imageId>.webp`.
    Thumb,
}

impl Bucket {
    pub fn as_str(self) -> &'static str {
        match self {
            Bucket::Raw => "raw",
            Bucket::Results => "results",
            Bucket::Thumb => "thumb",
        }
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Put failed: {0}")]
    PutFailed(String),

    #[error("Get failed: {0}")]
    GetFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage path: {0}")]
    InvalidPath(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<StorageError> for pixed_core::AppError {
    fn from(err: StorageError) -> Self {
        pixed_core::AppError::Storage(err.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Signed URLs never outlive the bucket lifecycle policy.
pub fn clamp_ttl(ttl: Duration) -> Duration {
    ttl.min(BUCKET_LIFECYCLE)
}

/// Storage abstraction over the three logical buckets.
///
/// Implementations must make `delete` idempotent (deleting a missing
/// object is not an error) and `signed_url` read-only.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write an object. The declared content type is recorded where the
    /// backend supports it.
    async fn put(
        &self,
        bucket: Bucket,
        path: &str,
        data: Bytes,
        content_type: &str,
    ) -> StorageResult<()>;

    /// Read an object in full. Missing objects are `StorageError::NotFound`.
    async fn get(&self, bucket: Bucket, path: &str) -> StorageResult<Bytes>;

    /// Time-limited read-only URL for direct client access.
    async fn signed_url(
        &self,
        bucket: Bucket,
        path: &str,
        ttl: Duration,
    ) -> StorageResult<String>;

    /// Delete an object; missing is not an error.
    async fn delete(&self, bucket: Bucket, path: &str) -> StorageResult<()>;

    async fn exists(&self, bucket: Bucket, path: &str) -> StorageResult<bool>;

    /// Delete every object in `bucket` whose path starts with `prefix`.
    async fn delete_prefix(&self, bucket: Bucket, prefix: &str) -> StorageResult<()>;

    /// Remove everything derived from an image: all of its revision outputs
    /// and its thumbnail. The raw original is deleted separately by the
    /// image service, which knows its exact path.
    async fn delete_all_for_image(&self, image_id: Uuid) -> StorageResult<()> {
        self.delete_prefix(Bucket::Results, &format!("{image_id}_"))
            .await?;
        self.delete(Bucket::Thumb, &paths::thumb_path(image_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_ttl() {
        let hour = Duration::from_secs(3600);
        assert_eq!(clamp_ttl(hour), hour);
        assert_eq!(clamp_ttl(Duration::from_secs(7 * 86_400)), BUCKET_LIFECYCLE);
    }
}
