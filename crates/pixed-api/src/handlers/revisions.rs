//! Undo and history handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use uuid::Uuid;

use crate::error::HttpAppError;
use crate::state::AppState;
use pixed_core::models::{HistoryResponse, RevisionResponse};

/// `POST /v1/images/:id/undo` - tombstone the latest revision and return
/// its parent as the now-active one.
pub async fn undo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let (revision, url) = state.revisions.undo(id).await?;
    let response = RevisionResponse::from_revision(&revision, Some(url))?;
    Ok(Json(response))
}

/// `GET /v1/images/:id/history` - non-tombstoned revisions, oldest first.
pub async fn history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    let revisions = state.revisions.get_history(id).await?;
    let revisions = revisions
        .iter()
        .map(|r| RevisionResponse::from_revision(r, None))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(HistoryResponse {
        image_id: id,
        revisions,
    }))
}
