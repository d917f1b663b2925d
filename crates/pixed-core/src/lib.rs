//! Core types for the pixed image revision service.
//!
//! This crate holds everything the other members agree on: the unified
//! [`AppError`] type with its HTTP metadata, environment-driven
//! [`Config`](config::Config), shared constants, and the domain models
//! (images, revisions, and the [`Operation`](models::Operation) sum type).
//! It performs no I/O.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;

pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
