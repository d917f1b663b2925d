//! Uploaded image model.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A stored original and the identity all of its revisions hang off.
///
/// Rows are created at ingest and never mutated in place (`updated_at`
/// tracks cascade-relevant events, not content changes - the original
/// blob is immutable for the life of the image).
#[derive(Debug, Clone, FromRow)]
pub struct ImageRecord {
    pub id: Uuid,
    /// Opaque caller-supplied identity; never interpreted.
    pub owner: String,
    /// Locator within the raw bucket.
    pub original_path: String,
    pub size_bytes: i64,
    pub mime: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of the 201 response to `POST /v1/images`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageUploadResponse {
    pub image_id: Uuid,
    pub thumbnail_url: String,
    pub size: i64,
    pub mime_type: String,
}

/// Body of the 200 response to `GET /v1/images/:id`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetaResponse {
    pub image_id: Uuid,
    pub size: i64,
    pub mime_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub download_url: String,
}

impl ImageMetaResponse {
    pub fn from_record(record: &ImageRecord, download_url: String) -> Self {
        Self {
            image_id: record.id,
            size: record.size_bytes,
            mime_type: record.mime.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
            download_url,
        }
    }
}
