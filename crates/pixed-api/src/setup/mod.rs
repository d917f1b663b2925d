//! Application wiring: pool, storage backend, cache, services, routes.

pub mod routes;
pub mod server;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;
use pixed_cache::Cache;
use pixed_core::Config;
use pixed_services::{ImageService, RevisionService};
use pixed_storage::lifecycle::LifecycleSweeper;
use pixed_storage::{GcsObjectStore, LocalObjectStore, ObjectStore};

/// Build every dependency and the router. Fails fast on unreachable
/// infrastructure unless `SKIP_DB_CHECK` waives the metadata-store gate.
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, Router), anyhow::Error> {
    let pool = pixed_db::connect(&config).await?;

    if config.skip_db_check {
        tracing::warn!("SKIP_DB_CHECK set: skipping migrations and connectivity gate");
    } else {
        pixed_db::run_migrations(&pool).await?;
        sqlx::query("SELECT 1").execute(&pool).await?;
    }

    let store = build_storage(&config).await?;
    let cache = Cache::connect(&config.redis_url).await?;

    let state = Arc::new(AppState {
        images: ImageService::new(pool.clone(), store.clone(), cache.clone()),
        revisions: RevisionService::new(pool.clone(), store, cache),
        pool,
        config,
    });

    let router = routes::setup_routes(&state.config, state.clone())?;
    Ok((state, router))
}

async fn build_storage(config: &Config) -> Result<Arc<dyn ObjectStore>, anyhow::Error> {
    if let Some(project_id) = &config.gcp_project_id {
        let store = GcsObjectStore::new(project_id, &config.gcs_bucket_prefix)?;
        Ok(Arc::new(store))
    } else {
        let store = Arc::new(
            LocalObjectStore::new(
                config.local_storage_path.clone(),
                config.local_storage_base_url.clone(),
            )
            .await?,
        );
        // Local mode has no bucket-level lifecycle; enforce the age policy
        // with the background sweeper.
        LifecycleSweeper::new(store.clone()).start();
        Ok(store)
    }
}
