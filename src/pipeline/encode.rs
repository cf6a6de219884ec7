//! Image encoding: canonical JPEG for storage, base64 for transport.
//!
//! Every stored `image_data` is a JPEG re-encode of the decoded upload, even
//! when the upload already was a JPEG. One format means every consumer
//! (report renderer, web client, history viewers) decodes the same thing.
//! JPEG cannot carry alpha, so images are flattened to RGB first.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView};
use tracing::debug;

/// Longest edge sent to the vision model. Larger photos are downscaled;
/// VLM tilers gain nothing beyond this.
pub const VISION_MAX_EDGE: u32 = 1568;

/// Re-encode `img` as JPEG at `quality`.
///
/// Deterministic: identical input pixels and quality give identical bytes.
pub fn encode_canonical(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buf = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))?;
    debug!(
        "Canonical JPEG {}x{} → {} bytes",
        rgb.width(),
        rgb.height(),
        buf.len()
    );
    Ok(buf)
}

/// Standard-alphabet, padded base64.
pub fn to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Strip an optional `data:<mime>;base64,` prefix.
pub fn strip_data_uri(payload: &str) -> &str {
    let payload = payload.trim();
    match payload.strip_prefix("data:") {
        Some(rest) => match rest.split_once(";base64,") {
            Some((_, data)) => data,
            None => payload,
        },
        None => payload,
    }
}

/// Decode a base64 image payload (data-URI prefix allowed) to raw bytes.
pub fn decode_payload(payload: &str) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(strip_data_uri(payload))
}

/// Prepare a photo for the vision model: cap the longest edge, JPEG, base64.
pub fn vision_image_data(img: &DynamicImage, quality: u8) -> Result<ImageData, image::ImageError> {
    let (w, h) = img.dimensions();
    let bytes = if w.max(h) > VISION_MAX_EDGE {
        encode_canonical(&img.thumbnail(VISION_MAX_EDGE, VISION_MAX_EDGE), quality)?
    } else {
        encode_canonical(img, quality)?
    };
    Ok(ImageData::new(to_base64(&bytes), "image/jpeg").with_detail("high"))
}
