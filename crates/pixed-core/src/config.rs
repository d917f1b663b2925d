//! Configuration module
//!
//! Environment-driven configuration for the service. Storage backend
//! selection follows the deployment convention: when `GCP_PROJECT_ID` is
//! set the object store targets GCS buckets named
//! `<GCS_BUCKET_PREFIX>-{raw,results,thumb}`; otherwise the service runs
//! against the local filesystem.

use std::env;

const DEFAULT_PORT: u16 = 3000;
const DB_MAX_CONNECTIONS: u32 = 20;
const DEFAULT_POSTGRES_PORT: u16 = 5432;
const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
const DEFAULT_LOCAL_STORAGE_PATH: &str = "./data/buckets";

#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub cors_origin: Option<String>,
    pub database_url: String,
    pub db_max_connections: u32,
    pub redis_url: String,
    /// Presence selects the GCS backend; absence selects local-filesystem mode.
    pub gcp_project_id: Option<String>,
    pub gcs_bucket_prefix: String,
    pub local_storage_path: String,
    pub local_storage_base_url: String,
    /// Skip the startup metadata-store connectivity gate (migrations + ping).
    /// The reference deployment's full stateless mode is intentionally not
    /// supported beyond this.
    pub skip_db_check: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let server_port = parse_env("PORT", DEFAULT_PORT)?;

        let pg_host = env::var("POSTGRES_HOST").unwrap_or_else(|_| "localhost".to_string());
        let pg_port: u16 = parse_env("POSTGRES_PORT", DEFAULT_POSTGRES_PORT)?;
        let pg_db = env::var("POSTGRES_DB").unwrap_or_else(|_| "pixed".to_string());
        let pg_user = env::var("POSTGRES_USER").unwrap_or_else(|_| "postgres".to_string());
        let pg_password = env::var("POSTGRES_PASSWORD").unwrap_or_default();

        let database_url = format!(
            "postgres://{}:{}@{}:{}/{}",
            pg_user, pg_password, pg_host, pg_port, pg_db
        );

        let gcp_project_id = env::var("GCP_PROJECT_ID").ok().filter(|v| !v.is_empty());
        let gcs_bucket_prefix =
            env::var("GCS_BUCKET_PREFIX").unwrap_or_else(|_| "pixed".to_string());

        let local_storage_path = env::var("LOCAL_STORAGE_PATH")
            .unwrap_or_else(|_| DEFAULT_LOCAL_STORAGE_PATH.to_string());
        let local_storage_base_url = env::var("LOCAL_STORAGE_BASE_URL")
            .unwrap_or_else(|_| format!("http://localhost:{}/files", server_port));

        Ok(Config {
            server_port,
            cors_origin: env::var("CORS_ORIGIN").ok().filter(|v| !v.is_empty()),
            database_url,
            db_max_connections: DB_MAX_CONNECTIONS,
            redis_url: env::var("REDIS_URL").unwrap_or_else(|_| DEFAULT_REDIS_URL.to_string()),
            gcp_project_id,
            gcs_bucket_prefix,
            local_storage_path,
            local_storage_base_url,
            skip_db_check: env_flag("SKIP_DB_CHECK"),
        })
    }

    pub fn use_gcs(&self) -> bool {
        self.gcp_project_id.is_some()
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, anyhow::Error>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid {}: {}", name, e)),
        Err(_) => Ok(default),
    }
}

fn env_flag(name: &str) -> bool {
    matches!(
        env::var(name).as_deref(),
        Ok("1") | Ok("true") | Ok("TRUE") | Ok("yes")
    )
}
