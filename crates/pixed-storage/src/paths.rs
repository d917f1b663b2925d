//! Deterministic object path layout.
//!
//! Raw: `<owner>/<imageId>.<ext>`, results: `<imageId>_<revisionId>.<ext>`,
//! thumb: `<imageId>.webp`. All backends use these helpers so metadata rows
//! and bucket contents always agree.

use uuid::Uuid;

use pixed_core::constants::mime_for_ext;

pub fn raw_path(owner: &str, image_id: Uuid, ext: &str) -> String {
    format!("{owner}/{image_id}.{ext}")
}

pub fn results_path(image_id: Uuid, revision_id: Uuid, ext: &str) -> String {
    format!("{image_id}_{revision_id}.{ext}")
}

pub fn thumb_path(image_id: Uuid) -> String {
    format!("{image_id}.webp")
}

/// Recover a blob's content type from its path extension. Revision rows do
/// not carry a mime column; the extension is the durable record.
pub fn mime_from_path(path: &str) -> Option<&'static str> {
    let ext = path.rsplit('.').next()?;
    mime_for_ext(ext)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_layout() {
        let image = Uuid::nil();
        let revision = Uuid::max();
        assert_eq!(
            raw_path("user-1", image, "png"),
            format!("user-1/{image}.png")
        );
        assert_eq!(
            results_path(image, revision, "jpg"),
            format!("{image}_{revision}.jpg")
        );
        assert_eq!(thumb_path(image), format!("{image}.webp"));
    }

    #[test]
    fn test_mime_from_path() {
        assert_eq!(mime_from_path("a/b.jpg"), Some("image/jpeg"));
        assert_eq!(mime_from_path("x_y.png"), Some("image/png"));
        assert_eq!(mime_from_path("t.webp"), Some("image/webp"));
        assert_eq!(mime_from_path("noext"), None);
    }
}
