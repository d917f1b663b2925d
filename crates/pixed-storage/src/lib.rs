//! Object storage for the pixed service.
//!
//! Three logical buckets hold everything the service persists outside the
//! metadata store: `raw` (uploaded originals), `results` (revision
//! outputs), and `thumb` (derived previews). All backends implement the
//! [`ObjectStore`] trait; application setup selects GCS when
//! `GCP_PROJECT_ID` is configured and the local filesystem otherwise.
//!
//! Every bucket carries a one-day age-based deletion policy. On GCS that is
//! bucket configuration; in local mode the [`lifecycle`] sweeper enforces
//! it. Signed URLs are read-only and clamped to that lifecycle.

pub mod gcs;
pub mod lifecycle;
pub mod local;
pub mod paths;
pub mod traits;

pub use gcs::GcsObjectStore;
pub use local::LocalObjectStore;
pub use traits::{Bucket, ObjectStore, StorageError, StorageResult};
