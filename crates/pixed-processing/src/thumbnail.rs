//! Thumbnail derivation: fit inside 400×400, lossy WebP.
//!
//! The `image` crate only writes lossless WebP, so encoding goes through
//! the `webp` crate at quality 80.

use bytes::Bytes;
use image::{imageops, GenericImageView, ImageReader};
use std::io::Cursor;

use crate::pipeline::PipelineError;
use pixed_core::constants::{THUMB_MAX_DIM, THUMB_WEBP_QUALITY};

/// Derive the WebP preview for an original. Aspect ratio is preserved and
/// images already smaller than the box are not enlarged.
pub fn derive_thumbnail(src: &[u8]) -> Result<Bytes, PipelineError> {
    let img = ImageReader::new(Cursor::new(src))
        .with_guessed_format()
        .map_err(|e| PipelineError::Decode(e.to_string()))?
        .decode()
        .map_err(|e| PipelineError::Decode(e.to_string()))?;

    let (src_w, src_h) = img.dimensions();
    let ratio = (THUMB_MAX_DIM as f64 / src_w as f64)
        .min(THUMB_MAX_DIM as f64 / src_h as f64)
        .min(1.0);
    let w = ((src_w as f64 * ratio).round() as u32).max(1);
    let h = ((src_h as f64 * ratio).round() as u32).max(1);

    let resized = if (w, h) == (src_w, src_h) {
        img
    } else {
        img.resize_exact(w, h, imageops::FilterType::Lanczos3)
    };

    let rgba = resized.to_rgba8();
    let encoder = webp::Encoder::from_rgba(&rgba, w, h);
    let encoded = encoder.encode(THUMB_WEBP_QUALITY);
    Ok(Bytes::copy_from_slice(&encoded))
}
