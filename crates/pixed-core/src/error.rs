//! Error types module
//!
//! All errors surfaced by the service are unified under the [`AppError`]
//! enum, which can represent database, storage, cache, codec, and
//! domain-specific failures. The [`ErrorMetadata`] trait lets each variant
//! self-describe its HTTP response characteristics so the API layer never
//! hand-maps variants to status codes.

use sqlx::Error as SqlxError;
use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected errors like validation failures
    Debug,
    /// Recoverable issues like lock contention
    Warn,
    /// Unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented.
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "NOT_FOUND")
    fn error_code(&self) -> &'static str;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Codec error: {0}")]
    Codec(String),

    #[error("Source blob missing: {0}")]
    SourceMissing(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Unsupported content type: {0}")]
    UnsupportedMime(String),

    #[error("Payload too large: {size} bytes (max: {max} bytes)")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Lock not acquired: {0}")]
    Concurrency(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("No revision to undo")]
    NothingToUndo,

    #[error("Cannot undo past the original")]
    CannotUndoOriginal,

    #[error("Revision history corrupted: {0}")]
    Corrupted(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::Validation(format!("UUID parsing error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, log_level).
/// Keeps the `ErrorMetadata` impl free of duplicated match arms;
/// `client_message` stays per-variant for dynamic content.
fn static_metadata(err: &AppError) -> (u16, &'static str, LogLevel) {
    match err {
        AppError::Database(_) => (500, "DATABASE_ERROR", LogLevel::Error),
        AppError::Storage(_) => (500, "STORAGE_ERROR", LogLevel::Error),
        AppError::Cache(_) => (500, "CACHE_ERROR", LogLevel::Error),
        AppError::Codec(_) => (422, "CODEC_ERROR", LogLevel::Warn),
        AppError::SourceMissing(_) => (500, "SOURCE_MISSING", LogLevel::Error),
        AppError::Validation(_) => (400, "INVALID_INPUT", LogLevel::Debug),
        AppError::UnsupportedMime(_) => (415, "UNSUPPORTED_MEDIA_TYPE", LogLevel::Debug),
        AppError::PayloadTooLarge { .. } => (413, "PAYLOAD_TOO_LARGE", LogLevel::Debug),
        AppError::NotFound(_) => (404, "NOT_FOUND", LogLevel::Debug),
        AppError::Concurrency(_) => (503, "LOCK_TIMEOUT", LogLevel::Warn),
        AppError::Protocol(_) => (400, "PROTOCOL_ERROR", LogLevel::Debug),
        AppError::NothingToUndo => (400, "NOTHING_TO_UNDO", LogLevel::Debug),
        AppError::CannotUndoOriginal => (400, "CANNOT_UNDO_ORIGINAL", LogLevel::Debug),
        AppError::Corrupted(_) => (500, "HISTORY_CORRUPTED", LogLevel::Error),
        AppError::Internal(_) => (500, "INTERNAL_ERROR", LogLevel::Error),
        AppError::InternalWithSource { .. } => (500, "INTERNAL_ERROR", LogLevel::Error),
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        static_metadata(self).1
    }

    fn log_level(&self) -> LogLevel {
        static_metadata(self).2
    }

    fn client_message(&self) -> String {
        match self {
            // Infrastructure details stay server-side.
            AppError::Database(_) => "Failed to access metadata store".to_string(),
            AppError::Storage(_) => "Failed to access object storage".to_string(),
            AppError::Cache(_) => "Failed to access cache".to_string(),
            AppError::SourceMissing(_) => "Source image data is unavailable".to_string(),
            AppError::Codec(_) => "Cannot decode image".to_string(),
            AppError::Concurrency(_) => {
                "Image is busy with another edit, retry shortly".to_string()
            }
            AppError::Corrupted(_) => "Revision history is inconsistent".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        }
    }
}
