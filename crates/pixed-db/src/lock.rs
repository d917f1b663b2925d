//! Per-image exclusive locking.
//!
//! The serialization point of the transform pipeline: an exclusive row lock
//! on the image inside a transaction, rather than an in-process mutex, so
//! correctness holds across horizontally scaled workers. The closure runs
//! inside the transaction and commits on normal return, rolls back on
//! failure.

use sqlx::{PgPool, Postgres, Transaction};
use std::future::Future;
use std::pin::Pin;
use tokio::time::timeout;
use uuid::Uuid;

use pixed_core::constants::IMAGE_LOCK_TIMEOUT;
use pixed_core::AppError;

/// Boxed future type returned by [`with_image_lock`] closures.
pub type LockedFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, AppError>> + Send + 'a>>;

/// Run `f` while holding the exclusive row lock on `image_id`.
///
/// Lock acquisition is bounded: a waiter that cannot take the lock within
/// the deadline fails with `AppError::Concurrency` and leaves no trace.
/// A missing image row fails with `AppError::NotFound` before `f` runs.
pub async fn with_image_lock<T, F>(pool: &PgPool, image_id: Uuid, f: F) -> Result<T, AppError>
where
    F: for<'a> FnOnce(&'a mut Transaction<'static, Postgres>) -> LockedFuture<'a, T>,
{
    let mut tx = pool.begin().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to begin transaction");
        AppError::Database(e)
    })?;

    let lock_query = sqlx::query_as::<_, (Uuid,)>("SELECT id FROM images WHERE id = $1 FOR UPDATE")
        .bind(image_id)
        .fetch_optional(&mut *tx);

    let locked = match timeout(IMAGE_LOCK_TIMEOUT, lock_query).await {
        Ok(result) => result?,
        Err(_) => {
            // Dropping the transaction releases the waiter.
            tracing::warn!(image_id = %image_id, "Timed out waiting for image lock");
            return Err(AppError::Concurrency(format!(
                "image {image_id} lock not acquired within {}s",
                IMAGE_LOCK_TIMEOUT.as_secs()
            )));
        }
    };

    if locked.is_none() {
        let _ = tx.rollback().await;
        return Err(AppError::NotFound(format!("Image {image_id} not found")));
    }

    match f(&mut tx).await {
        Ok(value) => {
            tx.commit().await.map_err(|e| {
                tracing::error!(error = %e, "Failed to commit transaction");
                AppError::Database(e)
            })?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::error!(
                    error = %rollback_err,
                    original_error = %e,
                    "Failed to rollback transaction"
                );
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ImageRepository, RevisionRepository};
    use serde_json::json;

    /// Integration tests need a live Postgres; they skip themselves when
    /// DATABASE_URL is not set.
    async fn test_pool() -> Option<PgPool> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let pool = PgPool::connect(&url).await.ok()?;
        crate::run_migrations(&pool).await.ok()?;
        Some(pool)
    }

    async fn seed_image(pool: &PgPool) -> Uuid {
        let id = Uuid::new_v4();
        ImageRepository::new(pool.clone())
            .create(id, "tester", &format!("tester/{id}.png"), 128, "image/png")
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn test_lock_missing_image_is_not_found() {
        let Some(pool) = test_pool().await else {
            eprintln!("skipping: DATABASE_URL not set");
            return;
        };

        let result =
            with_image_lock(&pool, Uuid::new_v4(), |_tx| Box::pin(async { Ok(()) })).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_lock_rolls_back_on_error() {
        let Some(pool) = test_pool().await else {
            eprintln!("skipping: DATABASE_URL not set");
            return;
        };

        let image_id = seed_image(&pool).await;
        let rev_id = Uuid::new_v4();

        let result: Result<(), AppError> = with_image_lock(&pool, image_id, |tx| {
            Box::pin(async move {
                RevisionRepository::create_tx(
                    tx,
                    rev_id,
                    image_id,
                    None,
                    1,
                    &json!({"degrees": 90}),
                    &format!("{image_id}_{rev_id}.png"),
                )
                .await?;
                Err(AppError::Internal("forced failure".to_string()))
            })
        })
        .await;
        assert!(result.is_err());

        // The insert must not be observable.
        let revisions = RevisionRepository::new(pool.clone())
            .history(image_id)
            .await
            .unwrap();
        assert!(revisions.is_empty());

        ImageRepository::new(pool.clone()).delete(image_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_sections_serialize() {
        let Some(pool) = test_pool().await else {
            eprintln!("skipping: DATABASE_URL not set");
            return;
        };

        let image_id = seed_image(&pool).await;
        let repo = RevisionRepository::new(pool.clone());

        // Each task reads the visible latest and inserts a child of it.
        // Serialization through the lock means the result is a chain, not a
        // star: every parent_id is distinct.
        let mut handles = Vec::new();
        for _ in 0..4 {
            let pool = pool.clone();
            handles.push(tokio::spawn(async move {
                with_image_lock(&pool, image_id, |tx| {
                    Box::pin(async move {
                        let parent = RevisionRepository::latest_visible_tx(tx, image_id).await?;
                        let rev_id = Uuid::new_v4();
                        RevisionRepository::create_tx(
                            tx,
                            rev_id,
                            image_id,
                            parent.map(|p| p.id),
                            1,
                            &json!({"degrees": 90}),
                            &format!("{image_id}_{rev_id}.png"),
                        )
                        .await?;
                        Ok(())
                    })
                })
                .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let history = repo.history(image_id).await.unwrap();
        assert_eq!(history.len(), 4);
        let mut parents: Vec<_> = history.iter().map(|r| r.parent_id).collect();
        parents.sort();
        parents.dedup();
        assert_eq!(parents.len(), 4, "each revision must have a distinct parent");
        assert_eq!(history.iter().filter(|r| r.parent_id.is_none()).count(), 1);

        ImageRepository::new(pool.clone()).delete(image_id).await.unwrap();
    }
}
