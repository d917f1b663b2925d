//! Local filesystem storage implementation.
//!
//! Bucket layout is `<base>/<bucket>/<path>`. "Signed" URLs are plain links
//! under the configured base URL carrying an `expires` query parameter; a
//! fronting file server is expected to treat them as read-only. This
//! backend exists for development and tests, and is selected whenever
//! `GCP_PROJECT_ID` is absent.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::traits::{clamp_ttl, Bucket, ObjectStore, StorageError, StorageResult};

#[derive(Clone)]
pub struct LocalObjectStore {
    base_path: PathBuf,
    base_url: String,
}

impl LocalObjectStore {
    /// # Arguments
    /// * `base_path` - Root directory, one subdirectory per bucket
    /// * `base_url` - Base URL for serving files (e.g. "http://localhost:3000/files")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let base_path = base_path.into();

        for bucket in [Bucket::Raw, Bucket::Results, Bucket::Thumb] {
            let dir = base_path.join(bucket.as_str());
            fs::create_dir_all(&dir).await.map_err(|e| {
                StorageError::ConfigError(format!(
                    "Failed to create storage directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        Ok(LocalObjectStore {
            base_path,
            base_url,
        })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Converts a bucket-relative storage path to a filesystem path,
    /// rejecting traversal.
    fn key_to_path(&self, bucket: Bucket, path: &str) -> StorageResult<PathBuf> {
        if path.is_empty()
            || path.starts_with('/')
            || path.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..")
        {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(self.base_path.join(bucket.as_str()).join(path))
    }

    fn generate_url(&self, bucket: Bucket, path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            bucket.as_str(),
            path
        )
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(
        &self,
        bucket: Bucket,
        path: &str,
        data: Bytes,
        _content_type: &str,
    ) -> StorageResult<()> {
        let fs_path = self.key_to_path(bucket, path)?;
        if let Some(parent) = fs_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&fs_path).await.map_err(|e| {
            tracing::error!(path = %fs_path.display(), error = %e, "Local put create failed");
            StorageError::PutFailed(format!("Failed to create {}: {}", fs_path.display(), e))
        })?;
        file.write_all(&data).await.map_err(|e| {
            tracing::error!(path = %fs_path.display(), error = %e, "Local put write failed");
            StorageError::PutFailed(format!("Failed to write {}: {}", fs_path.display(), e))
        })?;
        file.sync_all().await.map_err(|e| {
            StorageError::PutFailed(format!("Failed to sync {}: {}", fs_path.display(), e))
        })?;

        tracing::debug!(bucket = %bucket, path = %path, size_bytes = data.len(), "Local put");
        Ok(())
    }

    async fn get(&self, bucket: Bucket, path: &str) -> StorageResult<Bytes> {
        let fs_path = self.key_to_path(bucket, path)?;
        match fs::read(&fs_path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(format!("{bucket}/{path}")))
            }
            Err(e) => Err(StorageError::GetFailed(format!(
                "Failed to read {}: {}",
                fs_path.display(),
                e
            ))),
        }
    }

    async fn signed_url(
        &self,
        bucket: Bucket,
        path: &str,
        ttl: Duration,
    ) -> StorageResult<String> {
        self.key_to_path(bucket, path)?;
        let expires = chrono::Utc::now() + clamp_ttl(ttl);
        Ok(format!(
            "{}?expires={}",
            self.generate_url(bucket, path),
            expires.timestamp()
        ))
    }

    async fn delete(&self, bucket: Bucket, path: &str) -> StorageResult<()> {
        let fs_path = self.key_to_path(bucket, path)?;
        match fs::remove_file(&fs_path).await {
            Ok(()) => Ok(()),
            // Idempotent: missing is not an error.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to delete {}: {}",
                fs_path.display(),
                e
            ))),
        }
    }

    async fn exists(&self, bucket: Bucket, path: &str) -> StorageResult<bool> {
        let fs_path = self.key_to_path(bucket, path)?;
        Ok(fs::try_exists(&fs_path).await.unwrap_or(false))
    }

    async fn delete_prefix(&self, bucket: Bucket, prefix: &str) -> StorageResult<()> {
        // The results bucket is flat, so a single directory scan suffices.
        let dir = self.base_path.join(bucket.as_str());
        let mut entries = fs::read_dir(&dir).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to scan {}: {}", dir.display(), e))
        })?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::DeleteFailed(e.to_string()))?
        {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with(prefix) {
                match fs::remove_file(entry.path()).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(StorageError::DeleteFailed(e.to_string())),
                }
            }
        }
        Ok(())
    }
}
