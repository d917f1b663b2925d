//! Service layer: the operations the HTTP surface exposes.
//!
//! [`ImageService`] owns the ingest path (validate, store, row, thumbnail)
//! and image lifecycle; [`RevisionService`] owns the transform pipeline -
//! the per-image serialized state machine that appends revisions, walks
//! history, and undoes by tombstoning.

pub mod image;
pub mod revision;

pub use image::ImageService;
pub use revision::RevisionService;
