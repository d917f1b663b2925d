//! Image processing for the pixed service.
//!
//! [`pipeline`] is the adapter between the [`Operation`] model and the
//! codec library: each call decodes its explicit source exactly once,
//! applies one operation, and encodes exactly once. No decoded state is
//! ever chained between operations - every revision is produced from a
//! fresh decode of its source blob. [`thumbnail`] derives the 400-px WebP
//! preview.
//!
//! [`Operation`]: pixed_core::models::Operation

pub mod pipeline;
pub mod thumbnail;

pub use pipeline::{apply, probe_dimensions, PipelineError};
pub use thumbnail::derive_thumbnail;
