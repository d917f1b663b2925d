//! Domain models: images, revisions, and edit operations.

mod image;
mod operation;
mod revision;

pub use image::{ImageMetaResponse, ImageRecord, ImageUploadResponse};
pub use operation::{InvalidOperation, OpType, Operation};
pub use revision::{HistoryResponse, Revision, RevisionResponse};
