//! Application state shared by all handlers.

use sqlx::PgPool;

use pixed_core::Config;
use pixed_services::{ImageService, RevisionService};

pub struct AppState {
    pub config: Config,
    pub pool: PgPool,
    pub images: ImageService,
    pub revisions: RevisionService,
}
