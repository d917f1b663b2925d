//! Postgres metadata store.
//!
//! Two relations (`images`, `revisions`) behind repository structs, plus
//! [`with_image_lock`]: the transactional per-image row lock every write
//! path of the revision pipeline serializes on.

pub mod images;
pub mod lock;
pub mod revisions;

pub use images::ImageRepository;
pub use lock::with_image_lock;
pub use revisions::RevisionRepository;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

use pixed_core::{AppError, Config};

/// Connect the shared pool. Sizing follows the service's concurrency model:
/// one pooled connection can carry one in-flight transform transaction.
pub async fn connect(config: &Config) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database_url)
        .await?;
    Ok(pool)
}

/// Apply embedded migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| AppError::Internal(format!("Migration failed: {}", e)))?;
    Ok(())
}
