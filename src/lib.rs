//! Workspace facade crate.
//!
//! The service is split into the `pixed-*` member crates; this root package
//! re-exports the two entry points and hosts the end-to-end test suite under
//! `tests/`.

pub use pixed_api as api;
pub use pixed_core as core;
