//! GCS storage implementation.
//!
//! One `object_store` client per logical bucket; bucket names are
//! `<prefix>-raw`, `<prefix>-results`, `<prefix>-thumb`. Credentials come
//! from the environment (service-account key or application-default), and
//! the one-day age lifecycle is bucket configuration, not client behavior.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use http::Method;
use object_store::gcp::{GoogleCloudStorage, GoogleCloudStorageBuilder};
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::Error as ObjectStoreError;
use object_store::ObjectStore as _;
use object_store::PutPayload;
use std::time::Duration;

use crate::traits::{clamp_ttl, Bucket, ObjectStore, StorageError, StorageResult};

pub struct GcsObjectStore {
    raw: GoogleCloudStorage,
    results: GoogleCloudStorage,
    thumb: GoogleCloudStorage,
    bucket_prefix: String,
}

impl GcsObjectStore {
    /// Build clients for the three buckets. `project_id` selects this
    /// backend in configuration; bucket access itself is authorized by the
    /// ambient GCS credentials.
    pub fn new(project_id: &str, bucket_prefix: &str) -> StorageResult<Self> {
        let build = |bucket: Bucket| -> StorageResult<GoogleCloudStorage> {
            GoogleCloudStorageBuilder::from_env()
                .with_bucket_name(format!("{bucket_prefix}-{}", bucket.as_str()))
                .build()
                .map_err(|e| StorageError::ConfigError(e.to_string()))
        };

        tracing::info!(
            project_id = %project_id,
            bucket_prefix = %bucket_prefix,
            "Using GCS object storage"
        );

        Ok(GcsObjectStore {
            raw: build(Bucket::Raw)?,
            results: build(Bucket::Results)?,
            thumb: build(Bucket::Thumb)?,
            bucket_prefix: bucket_prefix.to_string(),
        })
    }

    fn store_for(&self, bucket: Bucket) -> &GoogleCloudStorage {
        match bucket {
            Bucket::Raw => &self.raw,
            Bucket::Results => &self.results,
            Bucket::Thumb => &self.thumb,
        }
    }

    fn bucket_name(&self, bucket: Bucket) -> String {
        format!("{}-{}", self.bucket_prefix, bucket.as_str())
    }
}

#[async_trait]
impl ObjectStore for GcsObjectStore {
    async fn put(
        &self,
        bucket: Bucket,
        path: &str,
        data: Bytes,
        _content_type: &str,
    ) -> StorageResult<()> {
        let size = data.len();
        let location = Path::from(path);
        let start = std::time::Instant::now();

        self.store_for(bucket)
            .put(&location, PutPayload::from(data))
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket_name(bucket),
                    path = %path,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "GCS put failed"
                );
                StorageError::PutFailed(e.to_string())
            })?;

        tracing::info!(
            bucket = %self.bucket_name(bucket),
            path = %path,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "GCS put successful"
        );
        Ok(())
    }

    async fn get(&self, bucket: Bucket, path: &str) -> StorageResult<Bytes> {
        let location = Path::from(path);

        let result = self
            .store_for(bucket)
            .get(&location)
            .await
            .map_err(|e| match e {
                ObjectStoreError::NotFound { .. } => {
                    StorageError::NotFound(format!("{bucket}/{path}"))
                }
                other => {
                    tracing::error!(
                        error = %other,
                        bucket = %self.bucket_name(bucket),
                        path = %path,
                        "GCS get failed"
                    );
                    StorageError::GetFailed(other.to_string())
                }
            })?;

        result
            .bytes()
            .await
            .map_err(|e| StorageError::GetFailed(e.to_string()))
    }

    async fn signed_url(
        &self,
        bucket: Bucket,
        path: &str,
        ttl: Duration,
    ) -> StorageResult<String> {
        let location = Path::from(path);
        let url = self
            .store_for(bucket)
            .signed_url(Method::GET, &location, clamp_ttl(ttl))
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?;
        Ok(url.to_string())
    }

    async fn delete(&self, bucket: Bucket, path: &str) -> StorageResult<()> {
        let location = Path::from(path);
        match self.store_for(bucket).delete(&location).await {
            Ok(()) => Ok(()),
            // Idempotent: missing is not an error.
            Err(ObjectStoreError::NotFound { .. }) => Ok(()),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket_name(bucket),
                    path = %path,
                    "GCS delete failed"
                );
                Err(StorageError::DeleteFailed(e.to_string()))
            }
        }
    }

    async fn exists(&self, bucket: Bucket, path: &str) -> StorageResult<bool> {
        let location = Path::from(path);
        match self.store_for(bucket).head(&location).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    async fn delete_prefix(&self, bucket: Bucket, prefix: &str) -> StorageResult<()> {
        // `list` prefixes match whole path segments; results paths embed the
        // image id in the file name, so filter the flat listing ourselves.
        let store = self.store_for(bucket);
        let mut listing = store.list(None);

        while let Some(meta) = listing.next().await {
            let meta = meta.map_err(|e| StorageError::BackendError(e.to_string()))?;
            if meta.location.as_ref().starts_with(prefix) {
                match store.delete(&meta.location).await {
                    Ok(()) | Err(ObjectStoreError::NotFound { .. }) => {}
                    Err(e) => return Err(StorageError::DeleteFailed(e.to_string())),
                }
            }
        }
        Ok(())
    }
}
