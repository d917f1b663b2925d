//! Revision model: one immutable derived artifact per applied operation.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use super::operation::OpType;
use crate::error::AppError;

/// A committed edit. `parent_id = None` means "derived directly from the
/// original". `tombstoned_at` marks revisions that `undo` has retired from
/// the visible chain; tombstoned rows are never returned as "latest" and
/// never deleted by undo itself.
#[derive(Debug, Clone, FromRow)]
pub struct Revision {
    pub id: Uuid,
    pub image_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub op_type: i16,
    pub op_params: Value,
    /// Locator within the results bucket; unique across all revisions.
    pub storage_path: String,
    pub created_at: DateTime<Utc>,
    pub tombstoned_at: Option<DateTime<Utc>>,
}

impl Revision {
    pub fn op_type(&self) -> Result<OpType, AppError> {
        OpType::from_u16(self.op_type as u16)
            .ok_or_else(|| AppError::Corrupted(format!("unknown op_type {}", self.op_type)))
    }
}

/// Revision as rendered in REST responses.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionResponse {
    pub revision_id: Uuid,
    pub image_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    pub operation: &'static str,
    pub params: Value,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

impl RevisionResponse {
    pub fn from_revision(rev: &Revision, download_url: Option<String>) -> Result<Self, AppError> {
        Ok(Self {
            revision_id: rev.id,
            image_id: rev.image_id,
            parent_id: rev.parent_id,
            operation: rev.op_type()?.name(),
            params: rev.op_params.clone(),
            created_at: rev.created_at,
            download_url,
        })
    }
}

/// Body of the 200 response to `GET /v1/images/:id/history`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub image_id: Uuid,
    pub revisions: Vec<RevisionResponse>,
}
