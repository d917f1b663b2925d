//! Image ingest, metadata, and deletion handlers.

use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::error::HttpAppError;
use crate::state::AppState;
use pixed_core::models::ImageUploadResponse;
use pixed_core::AppError;

/// Caller identity from the optional `x-user-id` header; a random
/// identifier is assigned when absent. The value is opaque to the core.
fn owner_from_headers(headers: &HeaderMap) -> String {
    headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// `POST /v1/images` - multipart upload, field `image`.
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let owner = owner_from_headers(&headers);

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let mime = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
        upload = Some((mime, data));
        break;
    }

    let (mime, data) =
        upload.ok_or_else(|| AppError::Validation("No file provided in field 'image'".to_string()))?;

    let (record, thumbnail_url) = state.images.ingest(&owner, &mime, data).await?;

    Ok((
        StatusCode::CREATED,
        Json(ImageUploadResponse {
            image_id: record.id,
            thumbnail_url,
            size: record.size_bytes,
            mime_type: record.mime,
        }),
    ))
}

/// `GET /v1/images/:id` - metadata plus a download URL for the active
/// artifact.
pub async fn get_image(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let meta = state.images.metadata(id).await?;
    Ok(Json(meta))
}

/// `GET /v1/images/:id/thumbnail` - preview bytes, from cache or
/// rederived on demand.
pub async fn get_thumbnail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let bytes = state.images.thumbnail(id).await?;
    Ok(([("content-type", "image/webp")], bytes))
}

/// `DELETE /v1/images/:id` - destroy the image, its revisions, and every
/// reachable blob.
pub async fn delete_image(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.images.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
