//! HTTP surface of the pixed service.
//!
//! Thin axum handlers over the service layer: multipart ingest, the four
//! transform endpoints, undo, history, metadata, delete, and health. All
//! domain errors render through [`error::HttpAppError`] so status codes
//! and body shapes stay consistent.

pub mod error;
pub mod handlers;
pub mod setup;
pub mod state;
pub mod telemetry;
