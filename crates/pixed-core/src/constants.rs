//! Shared service constants.

use std::time::Duration;

/// Hard cap on ingest payloads. Uploads larger than this are rejected
/// before any bytes reach storage.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Content types accepted at ingest.
pub const ALLOWED_MIMES: &[&str] = &["image/jpeg", "image/png"];

/// Thumbnails fit inside a square of this many pixels.
pub const THUMB_MAX_DIM: u32 = 400;

/// Lossy WebP quality used for thumbnails.
pub const THUMB_WEBP_QUALITY: f32 = 80.0;

/// Cached thumbnail bytes expire after this long.
pub const THUMB_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Default validity of signed download URLs.
pub const SIGNED_URL_TTL: Duration = Duration::from_secs(60 * 60);

/// Age-based deletion policy carried by every bucket. Signed URLs are
/// clamped so they never outlive the objects they point at.
pub const BUCKET_LIFECYCLE: Duration = Duration::from_secs(24 * 60 * 60);

/// How long a transform request waits on the per-image lock before
/// surfacing `AppError::Concurrency`.
pub const IMAGE_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

pub fn mime_allowed(mime: &str) -> bool {
    ALLOWED_MIMES.contains(&mime)
}

/// File extension recorded in storage paths for a content type.
pub fn ext_for_mime(mime: &str) -> Option<&'static str> {
    match mime {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// Inverse of [`ext_for_mime`], used when only a storage path survives.
pub fn mime_for_ext(ext: &str) -> Option<&'static str> {
    match ext {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}
