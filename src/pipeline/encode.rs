//! Image encoding: rendered surface → PNG bytes or a base64 data URL.
//!
//! PNG is lossless, so text edges survive exactly as pdfium drew them, and
//! the `image` crate's PNG encoder is deterministic: the same surface always
//! yields the same bytes.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// MIME prefix for inline images.
pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Encode a rendered page surface as PNG.
pub fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    debug!(
        "Encoded {}x{} surface → {} bytes PNG",
        img.width(),
        img.height(),
        buf.len()
    );
    Ok(buf)
}

/// Wrap PNG bytes as a `data:image/png;base64,…` URL.
pub fn to_data_url(png: &[u8]) -> String {
    let b64 = STANDARD.encode(png);
    let mut url = String::with_capacity(PNG_DATA_URL_PREFIX.len() + b64.len());
    url.push_str(PNG_DATA_URL_PREFIX);
    url.push_str(&b64);
    url
}
