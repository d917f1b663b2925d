//! Image ingest and lifecycle.

use bytes::Bytes;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use pixed_cache::Cache;
use pixed_core::constants::{ext_for_mime, mime_allowed, MAX_UPLOAD_BYTES, SIGNED_URL_TTL};
use pixed_core::models::{ImageMetaResponse, ImageRecord};
use pixed_core::AppError;
use pixed_db::{ImageRepository, RevisionRepository};
use pixed_processing::derive_thumbnail;
use pixed_storage::{paths, Bucket, ObjectStore, StorageError};

/// TTL on the thumbnail derivation lock; bounds how long a crashed worker
/// can block rederivation.
const THUMB_LOCK_TTL: Duration = Duration::from_secs(30);
/// How long a miss waits for a concurrent deriver before giving up.
const THUMB_LOCK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct ImageService {
    images: ImageRepository,
    revisions: RevisionRepository,
    store: Arc<dyn ObjectStore>,
    cache: Cache,
}

impl ImageService {
    pub fn new(pool: PgPool, store: Arc<dyn ObjectStore>, cache: Cache) -> Self {
        Self {
            images: ImageRepository::new(pool.clone()),
            revisions: RevisionRepository::new(pool),
            store,
            cache,
        }
    }

    /// Ingest one upload: gate size and content type, decode-validate,
    /// write the original, insert the row, then synchronously derive the
    /// thumbnail.
    #[tracing::instrument(skip(self, data), fields(owner = %owner, mime = %mime, size = data.len()))]
    pub async fn ingest(
        &self,
        owner: &str,
        mime: &str,
        data: Bytes,
    ) -> Result<(ImageRecord, String), AppError> {
        if data.len() > MAX_UPLOAD_BYTES {
            return Err(AppError::PayloadTooLarge {
                size: data.len(),
                max: MAX_UPLOAD_BYTES,
            });
        }
        if !mime_allowed(mime) {
            return Err(AppError::UnsupportedMime(mime.to_string()));
        }

        // Reject bytes the codec cannot read before anything is persisted.
        let probe = data.clone();
        let (width, height) = tokio::task::spawn_blocking(move || {
            pixed_processing::probe_dimensions(&probe)
        })
        .await
        .map_err(|e| AppError::Internal(format!("codec task panicked: {e}")))??;

        let image_id = Uuid::new_v4();
        let ext = ext_for_mime(mime)
            .ok_or_else(|| AppError::Internal(format!("no extension for mime {mime}")))?;
        let original_path = paths::raw_path(owner, image_id, ext);

        self.store
            .put(Bucket::Raw, &original_path, data.clone(), mime)
            .await?;

        let record = self
            .images
            .create(image_id, owner, &original_path, data.len() as i64, mime)
            .await?;

        tracing::info!(
            image_id = %image_id,
            width,
            height,
            "Image ingested"
        );

        let thumbnail_url = self.derive_thumbnail(image_id, Some(data)).await?;
        Ok((record, thumbnail_url))
    }

    /// Derive the preview, store it in the thumb bucket, populate the
    /// cache, and return a signed URL.
    ///
    /// With `raw` supplied (the ingest path, fresh id) derivation runs
    /// directly. Without it the call is an on-demand rederive of the
    /// active artifact - the latest visible revision's blob, or the
    /// original when no revision exists - coordinated by the distributed
    /// lock so concurrent misses decode once.
    pub async fn derive_thumbnail(
        &self,
        image_id: Uuid,
        raw: Option<Bytes>,
    ) -> Result<String, AppError> {
        match raw {
            Some(bytes) => self.derive_and_store(image_id, bytes).await?,
            None => {
                let service = self.clone();
                self.cache
                    .with_lock(
                        &format!("thumb:{image_id}"),
                        THUMB_LOCK_TTL,
                        THUMB_LOCK_TIMEOUT,
                        || async move {
                            // A concurrent holder may have derived already.
                            if service.cache.get_thumb(image_id).await.ok().flatten().is_some() {
                                return Ok(());
                            }
                            let image = service
                                .images
                                .get(image_id)
                                .await?
                                .ok_or_else(|| {
                                    AppError::NotFound(format!("Image {image_id} not found"))
                                })?;
                            // Same source resolution as download_url_for:
                            // the thumbnail previews what a download would
                            // return, which is why transforms invalidate it.
                            let (bucket, path) =
                                match service.revisions.latest_visible(image_id).await? {
                                    Some(revision) => (Bucket::Results, revision.storage_path),
                                    None => (Bucket::Raw, image.original_path),
                                };
                            let bytes = match service.store.get(bucket, &path).await {
                                Ok(bytes) => bytes,
                                Err(StorageError::NotFound(path)) => {
                                    return Err(AppError::SourceMissing(path))
                                }
                                Err(e) => return Err(e.into()),
                            };
                            service.derive_and_store(image_id, bytes).await
                        },
                    )
                    .await?
            }
        }

        let url = self
            .store
            .signed_url(Bucket::Thumb, &paths::thumb_path(image_id), SIGNED_URL_TTL)
            .await?;
        Ok(url)
    }

    async fn derive_and_store(&self, image_id: Uuid, raw: Bytes) -> Result<(), AppError> {
        let thumb = tokio::task::spawn_blocking(move || derive_thumbnail(&raw))
            .await
            .map_err(|e| AppError::Internal(format!("codec task panicked: {e}")))??;

        self.store
            .put(
                Bucket::Thumb,
                &paths::thumb_path(image_id),
                thumb.clone(),
                "image/webp",
            )
            .await?;

        // The bucket is authoritative; a failed cache write only costs the
        // next read a miss.
        if let Err(e) = self.cache.set_thumb(image_id, &thumb).await {
            tracing::warn!(image_id = %image_id, error = %e, "Thumbnail cache write failed");
        }
        Ok(())
    }

    /// Thumbnail bytes for serving: cache hit, or rederive from the
    /// original (repopulating bucket and cache) on a miss.
    pub async fn thumbnail(&self, image_id: Uuid) -> Result<Vec<u8>, AppError> {
        if let Ok(Some(bytes)) = self.cache.get_thumb(image_id).await {
            return Ok(bytes);
        }

        self.derive_thumbnail(image_id, None).await?;

        match self.cache.get_thumb(image_id).await {
            Ok(Some(bytes)) => Ok(bytes),
            // Cache unavailable; the bucket is authoritative anyway.
            _ => Ok(self
                .store
                .get(Bucket::Thumb, &paths::thumb_path(image_id))
                .await?
                .to_vec()),
        }
    }

    pub async fn metadata(&self, image_id: Uuid) -> Result<ImageMetaResponse, AppError> {
        let record = self
            .images
            .get(image_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Image {image_id} not found")))?;
        let download_url = self.download_url_for(&record, None).await?;
        Ok(ImageMetaResponse::from_record(&record, download_url))
    }

    /// Signed URL for the original, a specific revision, or (with no
    /// revision id) the visible latest artifact.
    pub async fn download_url(
        &self,
        image_id: Uuid,
        revision_id: Option<Uuid>,
    ) -> Result<String, AppError> {
        let record = self
            .images
            .get(image_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Image {image_id} not found")))?;
        self.download_url_for(&record, revision_id).await
    }

    async fn download_url_for(
        &self,
        record: &ImageRecord,
        revision_id: Option<Uuid>,
    ) -> Result<String, AppError> {
        let url = match revision_id {
            Some(rid) => {
                let revision = self
                    .revisions
                    .get(rid)
                    .await?
                    .filter(|r| r.image_id == record.id)
                    .ok_or_else(|| AppError::NotFound(format!("Revision {rid} not found")))?;
                self.store
                    .signed_url(Bucket::Results, &revision.storage_path, SIGNED_URL_TTL)
                    .await?
            }
            None => match self.revisions.latest_visible(record.id).await? {
                Some(revision) => {
                    self.store
                        .signed_url(Bucket::Results, &revision.storage_path, SIGNED_URL_TTL)
                        .await?
                }
                None => {
                    self.store
                        .signed_url(Bucket::Raw, &record.original_path, SIGNED_URL_TTL)
                        .await?
                }
            },
        };
        Ok(url)
    }

    /// Destroy an image: the row (revisions cascade), the original blob,
    /// every revision output, the thumbnail, and the cache entry.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, image_id: Uuid) -> Result<(), AppError> {
        let record = self
            .images
            .get(image_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Image {image_id} not found")))?;

        // Metadata first: once the rows are gone nothing can observe the
        // blobs, and any stragglers from a partial blob sweep age out.
        self.images.delete(image_id).await?;

        self.store.delete(Bucket::Raw, &record.original_path).await?;
        self.store.delete_all_for_image(image_id).await?;

        if let Err(e) = self.cache.invalidate_thumb(image_id).await {
            tracing::warn!(image_id = %image_id, error = %e, "Thumbnail cache invalidation failed");
        }

        tracing::info!(image_id = %image_id, "Image deleted");
        Ok(())
    }
}
