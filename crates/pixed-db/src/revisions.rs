//! Revision repository.
//!
//! "Latest" always means the most recent row with `tombstoned_at IS NULL`;
//! undo retires rows by tombstoning them, never by deletion, so a later
//! apply_op parents off the visible latest and the chain diverges from the
//! tombstoned tail.

use serde_json::Value;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use pixed_core::models::Revision;
use pixed_core::AppError;

const SELECT_COLUMNS: &str =
    "id, image_id, parent_id, op_type, op_params, storage_path, created_at, tombstoned_at";

#[derive(Clone)]
pub struct RevisionRepository {
    pool: PgPool,
}

impl RevisionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a revision inside the caller's transaction. Always called
    /// under the per-image lock, after the result blob has been written.
    pub async fn create_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        image_id: Uuid,
        parent_id: Option<Uuid>,
        op_type: i16,
        op_params: &Value,
        storage_path: &str,
    ) -> Result<Revision, AppError> {
        let revision = sqlx::query_as::<_, Revision>(&format!(
            "INSERT INTO revisions (id, image_id, parent_id, op_type, op_params, storage_path) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(id)
        .bind(image_id)
        .bind(parent_id)
        .bind(op_type)
        .bind(op_params)
        .bind(storage_path)
        .fetch_one(&mut **tx)
        .await?;
        Ok(revision)
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Revision>, AppError> {
        let revision = sqlx::query_as::<_, Revision>(&format!(
            "SELECT {SELECT_COLUMNS} FROM revisions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(revision)
    }

    pub async fn get_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<Revision>, AppError> {
        let revision = sqlx::query_as::<_, Revision>(&format!(
            "SELECT {SELECT_COLUMNS} FROM revisions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(revision)
    }

    /// The visible latest revision: greatest `created_at` among
    /// non-tombstoned rows, or None when only the original exists.
    pub async fn latest_visible(&self, image_id: Uuid) -> Result<Option<Revision>, AppError> {
        let revision = sqlx::query_as::<_, Revision>(&format!(
            "SELECT {SELECT_COLUMNS} FROM revisions \
             WHERE image_id = $1 AND tombstoned_at IS NULL \
             ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(image_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(revision)
    }

    pub async fn latest_visible_tx(
        tx: &mut Transaction<'_, Postgres>,
        image_id: Uuid,
    ) -> Result<Option<Revision>, AppError> {
        let revision = sqlx::query_as::<_, Revision>(&format!(
            "SELECT {SELECT_COLUMNS} FROM revisions \
             WHERE image_id = $1 AND tombstoned_at IS NULL \
             ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(image_id)
        .fetch_optional(&mut **tx)
        .await?;
        Ok(revision)
    }

    /// All non-tombstoned revisions, oldest first.
    pub async fn history(&self, image_id: Uuid) -> Result<Vec<Revision>, AppError> {
        let revisions = sqlx::query_as::<_, Revision>(&format!(
            "SELECT {SELECT_COLUMNS} FROM revisions \
             WHERE image_id = $1 AND tombstoned_at IS NULL \
             ORDER BY created_at ASC"
        ))
        .bind(image_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(revisions)
    }

    /// Retire a revision from the visible chain.
    pub async fn tombstone_tx(
        tx: &mut Transaction<'_, Postgres>,
        revision_id: Uuid,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE revisions SET tombstoned_at = now() WHERE id = $1")
            .bind(revision_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}
