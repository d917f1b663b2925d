//! Transform endpoints: rotate, flip, resize, compress.
//!
//! Each endpoint parses its own body shape, builds the corresponding
//! [`Operation`], and hands it to the revision service. Responses are 202:
//! the revision row is committed, the artifact lives behind the returned
//! signed URL.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::HttpAppError;
use crate::state::AppState;
use pixed_core::models::{Operation, Revision};
use pixed_core::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformResponse {
    pub revision_id: Uuid,
    pub download_url: String,
    pub operation: &'static str,
    pub params: Value,
}

impl TransformResponse {
    fn new(revision: Revision, download_url: String) -> Result<Self, AppError> {
        Ok(Self {
            revision_id: revision.id,
            download_url,
            operation: revision.op_type()?.name(),
            params: revision.op_params,
        })
    }
}

async fn apply(
    state: &AppState,
    image_id: Uuid,
    op: Operation,
) -> Result<(StatusCode, Json<TransformResponse>), HttpAppError> {
    let (revision, url) = state.revisions.apply_op(image_id, op).await?;
    let response = TransformResponse::new(revision, url)?;
    Ok((StatusCode::ACCEPTED, Json(response)))
}

#[derive(Debug, Deserialize)]
pub struct RotateBody {
    pub degrees: u16,
}

/// `POST /v1/images/:id/rotate`
pub async fn rotate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<RotateBody>,
) -> Result<impl IntoResponse, HttpAppError> {
    apply(&state, id, Operation::Rotate { degrees: body.degrees }).await
}

#[derive(Debug, Deserialize)]
pub struct FlipBody {
    #[serde(default)]
    pub horizontal: bool,
    #[serde(default)]
    pub vertical: bool,
}

/// `POST /v1/images/:id/flip`
pub async fn flip(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<FlipBody>,
) -> Result<impl IntoResponse, HttpAppError> {
    apply(
        &state,
        id,
        Operation::Flip {
            horizontal: body.horizontal,
            vertical: body.vertical,
        },
    )
    .await
}

#[derive(Debug, Deserialize)]
pub struct ResizeBody {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// `POST /v1/images/:id/resize`
pub async fn resize(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<ResizeBody>,
) -> Result<impl IntoResponse, HttpAppError> {
    apply(
        &state,
        id,
        Operation::Resize {
            width: body.width,
            height: body.height,
        },
    )
    .await
}

/// `POST /v1/images/:id/ops` - one operation in the binary IEv1 form.
///
/// Framing failures (version, length, checksum) and out-of-range
/// parameters both reject with 400, as distinct error codes.
pub async fn apply_binary(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    body: axum::body::Bytes,
) -> Result<impl IntoResponse, HttpAppError> {
    let op = pixed_proto::decode(&body).map_err(AppError::from)?;
    apply(&state, id, op).await
}

/// Quality arrives as a wide integer so out-of-range values fail our
/// validation with a 400 rather than a serde range rejection.
#[derive(Debug, Deserialize)]
pub struct CompressBody {
    pub quality: u32,
}

/// `POST /v1/images/:id/compress`
pub async fn compress(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<CompressBody>,
) -> Result<impl IntoResponse, HttpAppError> {
    if !(10..=100).contains(&body.quality) {
        return Err(AppError::Validation(format!(
            "compress quality must be between 10 and 100 (got {})",
            body.quality
        ))
        .into());
    }
    apply(&state, id, Operation::Compress { quality: body.quality as u8 }).await
}
