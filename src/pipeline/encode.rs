//! Image encoding: `DynamicImage` → PNG or JPEG bytes.
//!
//! PNG keeps the bitmap lossless (alpha included). JPEG has no alpha
//! channel, so the bitmap is flattened to RGB before encoding; pdfium
//! already paints pages onto an opaque white background.

use crate::config::ImageFormat;
use image::codecs::jpeg::JpegEncoder;
use image::DynamicImage;
use std::io::Cursor;
use tracing::debug;

/// Encode a rasterised page in the requested format.
pub fn encode_page(
    img: &DynamicImage,
    format: ImageFormat,
    jpeg_quality: u8,
) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    match format {
        ImageFormat::Png => {
            img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;
        }
        ImageFormat::Jpeg => {
            let rgb = img.to_rgb8();
            JpegEncoder::new_with_quality(&mut buf, jpeg_quality).encode_image(&rgb)?;
        }
    }
    debug!(
        "Encoded {}x{} image → {} bytes {}",
        img.width(),
        img.height(),
        buf.len(),
        format
    );
    Ok(buf)
}
