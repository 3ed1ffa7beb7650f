//! Image encoding: `DynamicImage` → PNG → base64 [`PageImage`].
//!
//! PNG rather than JPEG: compression artefacts around thin pen strokes are
//! exactly what makes handwriting hard to read for a vision model.

use crate::session::PageImage;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// PNG-encode an image into a byte buffer.
pub fn to_png(img: &DynamicImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
    Ok(buf)
}

/// Encode a rendered page as a [`PageImage`] carrying a PNG data URL.
pub fn encode_page(page_num: usize, img: &DynamicImage) -> Result<PageImage, image::ImageError> {
    let png = to_png(img)?;
    let b64 = STANDARD.encode(&png);
    debug!("Encoded page {} → {} bytes base64", page_num, b64.len());

    Ok(PageImage::from_base64(page_num, img.width(), img.height(), &b64))
}

/// Decode a page image's payload back into raw PNG bytes.
pub fn decode_png(page: &PageImage) -> Result<Vec<u8>, base64::DecodeError> {
    STANDARD.decode(page.base64())
}
