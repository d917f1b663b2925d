//! Image repository.

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use pixed_core::models::ImageRecord;
use pixed_core::AppError;

const SELECT_COLUMNS: &str =
    "id, owner, original_path, size_bytes, mime, created_at, updated_at";

#[derive(Clone)]
pub struct ImageRepository {
    pool: PgPool,
}

impl ImageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        id: Uuid,
        owner: &str,
        original_path: &str,
        size_bytes: i64,
        mime: &str,
    ) -> Result<ImageRecord, AppError> {
        let record = sqlx::query_as::<_, ImageRecord>(&format!(
            "INSERT INTO images (id, owner, original_path, size_bytes, mime) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(id)
        .bind(owner)
        .bind(original_path)
        .bind(size_bytes)
        .bind(mime)
        .fetch_one(&self.pool)
        .await?;
        Ok(record)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<ImageRecord>, AppError> {
        let record = sqlx::query_as::<_, ImageRecord>(&format!(
            "SELECT {SELECT_COLUMNS} FROM images WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    /// Read inside the caller's transaction (used under the per-image lock).
    pub async fn get_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<ImageRecord>, AppError> {
        let record = sqlx::query_as::<_, ImageRecord>(&format!(
            "SELECT {SELECT_COLUMNS} FROM images WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(record)
    }

    /// Delete the row. Revisions cascade at the schema level; blob cleanup
    /// is the image service's job. Returns false when the image was absent.
    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM images WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Bump `updated_at`. The row is otherwise immutable; this only records
    /// that something derived from the image changed.
    pub async fn touch_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE images SET updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}
