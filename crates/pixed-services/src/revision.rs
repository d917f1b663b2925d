//! The revision pipeline: apply-operation state machine, undo, history.
//!
//! Every write path runs inside the per-image row lock, so a total order
//! exists over successful applies for one image. Step order inside the
//! lock is fixed: read image, read visible latest, fetch source bytes,
//! run the codec, write the result blob, insert the row, invalidate the
//! preview cache, commit. Blob before row - a crash between the two
//! leaves an unreferenced blob for the bucket lifecycle to collect,
//! never a visible revision pointing at missing bytes.

use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

use pixed_cache::Cache;
use pixed_core::constants::{ext_for_mime, SIGNED_URL_TTL};
use pixed_core::models::{Operation, Revision};
use pixed_core::AppError;
use pixed_db::{with_image_lock, ImageRepository, RevisionRepository};
use pixed_storage::{paths, Bucket, ObjectStore, StorageError};

#[derive(Clone)]
pub struct RevisionService {
    pool: PgPool,
    images: ImageRepository,
    revisions: RevisionRepository,
    store: Arc<dyn ObjectStore>,
    cache: Cache,
}

impl RevisionService {
    pub fn new(pool: PgPool, store: Arc<dyn ObjectStore>, cache: Cache) -> Self {
        Self {
            images: ImageRepository::new(pool.clone()),
            revisions: RevisionRepository::new(pool.clone()),
            pool,
            store,
            cache,
        }
    }

    /// Apply one validated operation to the image's current artifact and
    /// commit the resulting revision. Returns the revision and a signed
    /// URL for its blob.
    #[tracing::instrument(skip(self), fields(op = op.name()))]
    pub async fn apply_op(
        &self,
        image_id: Uuid,
        op: Operation,
    ) -> Result<(Revision, String), AppError> {
        op.validate()?;

        let store = self.store.clone();
        let cache = self.cache.clone();
        let op_in_tx = op.clone();

        let revision = with_image_lock(&self.pool, image_id, move |tx| {
            Box::pin(async move {
                // Re-read under the lock; the image may have been deleted
                // while we waited.
                let image = ImageRepository::get_tx(tx, image_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Image {image_id} not found")))?;

                let parent = RevisionRepository::latest_visible_tx(tx, image_id).await?;

                // Source: the latest revision's blob if one exists, the
                // original otherwise.
                let (src_bucket, src_path) = match &parent {
                    Some(parent) => (Bucket::Results, parent.storage_path.clone()),
                    None => (Bucket::Raw, image.original_path.clone()),
                };

                let src = match store.get(src_bucket, &src_path).await {
                    Ok(bytes) => bytes,
                    Err(StorageError::NotFound(path)) => {
                        return Err(AppError::SourceMissing(path));
                    }
                    Err(e) => return Err(e.into()),
                };

                let codec_op = op_in_tx.clone();
                let (result, out_mime) =
                    tokio::task::spawn_blocking(move || {
                        pixed_processing::apply(&codec_op, &src)
                    })
                    .await
                    .map_err(|e| AppError::Internal(format!("codec task panicked: {e}")))??;

                let revision_id = Uuid::new_v4();
                let ext = ext_for_mime(out_mime).ok_or_else(|| {
                    AppError::Internal(format!("no extension for mime {out_mime}"))
                })?;
                let storage_path = paths::results_path(image_id, revision_id, ext);

                // Blob first. If this put fails the transaction rolls back
                // and no revision row ever references it.
                store
                    .put(Bucket::Results, &storage_path, result, out_mime)
                    .await?;

                let revision = RevisionRepository::create_tx(
                    tx,
                    revision_id,
                    image_id,
                    parent.as_ref().map(|p| p.id),
                    op_in_tx.op_type().as_i16(),
                    &op_in_tx.to_params(),
                    &storage_path,
                )
                .await?;
                ImageRepository::touch_tx(tx, image_id).await?;

                // Invalidate while still holding the lock. Best-effort:
                // the committed revision is the source of truth, and a
                // failed invalidation only leaves a stale preview until
                // the TTL.
                if let Err(e) = cache.invalidate_thumb(image_id).await {
                    tracing::warn!(
                        image_id = %image_id,
                        error = %e,
                        "Thumbnail cache invalidation failed"
                    );
                }

                Ok(revision)
            })
        })
        .await?;

        let url = self
            .store
            .signed_url(Bucket::Results, &revision.storage_path, SIGNED_URL_TTL)
            .await?;

        tracing::info!(
            image_id = %image_id,
            revision_id = %revision.id,
            parent_id = ?revision.parent_id,
            "Revision committed"
        );

        Ok((revision, url))
    }

    /// Walk one step back: tombstone the visible latest revision and
    /// return its parent as the now-active artifact. Nothing is deleted;
    /// a subsequent apply parents off the returned revision and the chain
    /// diverges from the tombstoned tail. Repeating undo keeps walking
    /// back until the original, where it fails `CannotUndoOriginal`.
    #[tracing::instrument(skip(self))]
    pub async fn undo(&self, image_id: Uuid) -> Result<(Revision, String), AppError> {
        let cache = self.cache.clone();
        let parent = with_image_lock(&self.pool, image_id, move |tx| {
            Box::pin(async move {
                let current = RevisionRepository::latest_visible_tx(tx, image_id)
                    .await?
                    .ok_or(AppError::NothingToUndo)?;

                let parent_id = current.parent_id.ok_or(AppError::CannotUndoOriginal)?;

                let parent = RevisionRepository::get_tx(tx, parent_id).await?.ok_or_else(|| {
                    AppError::Corrupted(format!(
                        "revision {} references missing parent {parent_id}",
                        current.id
                    ))
                })?;

                RevisionRepository::tombstone_tx(tx, current.id).await?;

                // Invalidate before the lock is released; failure is
                // logged and swallowed.
                if let Err(e) = cache.invalidate_thumb(image_id).await {
                    tracing::warn!(
                        image_id = %image_id,
                        error = %e,
                        "Thumbnail cache invalidation failed"
                    );
                }

                tracing::info!(
                    image_id = %image_id,
                    undone = %current.id,
                    active = %parent.id,
                    "Revision undone"
                );
                Ok(parent)
            })
        })
        .await?;

        let url = self
            .store
            .signed_url(Bucket::Results, &parent.storage_path, SIGNED_URL_TTL)
            .await?;
        Ok((parent, url))
    }

    /// All non-tombstoned revisions, oldest first.
    pub async fn get_history(&self, image_id: Uuid) -> Result<Vec<Revision>, AppError> {
        self.images
            .get(image_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Image {image_id} not found")))?;
        self.revisions.history(image_id).await
    }
}
