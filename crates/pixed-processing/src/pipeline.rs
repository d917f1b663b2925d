//! Pipeline adapter: one operation against one freshly decoded source.

use bytes::Bytes;
use image::{imageops, DynamicImage, GenericImageView, ImageFormat, ImageReader};
use std::io::Cursor;
use thiserror::Error;

use pixed_core::models::Operation;

/// JPEG re-encode quality for operations that do not carry their own
/// (rotate/flip/resize on a JPEG source).
const DEFAULT_JPEG_QUALITY: u8 = 90;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Decode failed: {0}")]
    Decode(String),

    #[error("Encode failed: {0}")]
    Encode(String),
}

impl From<PipelineError> for pixed_core::AppError {
    fn from(err: PipelineError) -> Self {
        pixed_core::AppError::Codec(err.to_string())
    }
}

fn decode(src: &[u8]) -> Result<(DynamicImage, ImageFormat), PipelineError> {
    let reader = ImageReader::new(Cursor::new(src))
        .with_guessed_format()
        .map_err(|e| PipelineError::Decode(e.to_string()))?;
    let format = reader
        .format()
        .ok_or_else(|| PipelineError::Decode("unrecognized image format".to_string()))?;
    let img = reader
        .decode()
        .map_err(|e| PipelineError::Decode(e.to_string()))?;
    Ok((img, format))
}

/// Rotate clockwise by a validated angle. 90 and 270 swap the canvas
/// dimensions.
fn rotate(img: &DynamicImage, degrees: u16) -> DynamicImage {
    match degrees {
        90 => DynamicImage::ImageRgba8(imageops::rotate90(&img.to_rgba8())),
        180 => DynamicImage::ImageRgba8(imageops::rotate180(&img.to_rgba8())),
        270 => DynamicImage::ImageRgba8(imageops::rotate270(&img.to_rgba8())),
        _ => unreachable!("rotate angle validated upstream"),
    }
}

/// Both-set flips are applied as two flips, not as a 180 rotation, so the
/// result is bit-identical with applying the flags separately.
fn flip(img: &DynamicImage, horizontal: bool, vertical: bool) -> DynamicImage {
    let mut out = img.clone();
    if horizontal {
        out = DynamicImage::ImageRgba8(imageops::flip_horizontal(&out.to_rgba8()));
    }
    if vertical {
        out = DynamicImage::ImageRgba8(imageops::flip_vertical(&out.to_rgba8()));
    }
    out
}

/// Fit-inside target dimensions. An absent bound leaves that axis
/// unconstrained; aspect ratio is always preserved and enlargement is
/// permitted (the operation's 200..4000 bound is the only ceiling).
fn fit_inside(
    (src_w, src_h): (u32, u32),
    width: Option<u32>,
    height: Option<u32>,
) -> (u32, u32) {
    let ratio_w = width.map(|w| w as f64 / src_w as f64);
    let ratio_h = height.map(|h| h as f64 / src_h as f64);
    let ratio = match (ratio_w, ratio_h) {
        (Some(a), Some(b)) => a.min(b),
        (Some(a), None) => a,
        (None, Some(b)) => b,
        // Validation guarantees at least one bound.
        (None, None) => 1.0,
    };
    let w = ((src_w as f64 * ratio).round() as u32).max(1);
    let h = ((src_h as f64 * ratio).round() as u32).max(1);
    (w, h)
}

fn resize(img: &DynamicImage, width: Option<u32>, height: Option<u32>) -> DynamicImage {
    let (w, h) = fit_inside(img.dimensions(), width, height);
    img.resize_exact(w, h, imageops::FilterType::Lanczos3)
}

fn encode(img: &DynamicImage, format: ImageFormat, quality: u8) -> Result<Bytes, PipelineError> {
    let (width, height) = img.dimensions();
    let estimated = (width as usize) * (height as usize) * 3;
    let mut buffer = Vec::with_capacity(estimated.min(1 << 24));
    let mut cursor = Cursor::new(&mut buffer);

    match format {
        ImageFormat::Jpeg => {
            // JPEG carries no alpha channel.
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut cursor, quality);
            rgb.write_with_encoder(encoder)
                .map_err(|e| PipelineError::Encode(e.to_string()))?;
        }
        other => {
            img.write_to(&mut cursor, other)
                .map_err(|e| PipelineError::Encode(e.to_string()))?;
        }
    }

    Ok(Bytes::from(buffer))
}

fn mime_of(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Png => "image/png",
        ImageFormat::WebP => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Apply one operation to source bytes. Returns the encoded result and its
/// content type: JPEG for compress regardless of source (quality is only
/// meaningful for a lossy codec), the source format otherwise.
pub fn apply(op: &Operation, src: &[u8]) -> Result<(Bytes, &'static str), PipelineError> {
    let (img, src_format) = decode(src)?;

    let (out_img, out_format, quality) = match *op {
        Operation::Rotate { degrees } => (rotate(&img, degrees), src_format, DEFAULT_JPEG_QUALITY),
        Operation::Flip { horizontal, vertical } => {
            (flip(&img, horizontal, vertical), src_format, DEFAULT_JPEG_QUALITY)
        }
        Operation::Resize { width, height } => {
            (resize(&img, width, height), src_format, DEFAULT_JPEG_QUALITY)
        }
        Operation::Compress { quality } => (img, ImageFormat::Jpeg, quality),
    };

    let encoded = encode(&out_img, out_format, quality)?;
    tracing::debug!(
        op = op.name(),
        src_bytes = src.len(),
        out_bytes = encoded.len(),
        out_mime = mime_of(out_format),
        "Pipeline applied operation"
    );
    Ok((encoded, mime_of(out_format)))
}

/// Decode-validate a payload and report its dimensions. Used at ingest to
/// reject bytes the codec cannot read.
pub fn probe_dimensions(src: &[u8]) -> Result<(u32, u32), PipelineError> {
    let (img, _) = decode(src)?;
    Ok(img.dimensions())
}
