//! Image encoding: `DynamicImage` → base64 PNG wrapped in `ImageData`.
//!
//! Vision APIs take images as base64 data embedded in the request body. PNG
//! keeps small table text and figures crisp; `detail: "high"` asks
//! GPT-4-class models to look at the full-resolution tiles.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::ImageData;
use image::DynamicImage;
use std::io::Cursor;
use tracing::{debug, warn};

/// Encode one rendered page as a base64 PNG.
pub fn encode_page(img: &DynamicImage) -> Result<ImageData, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)?;

    let b64 = STANDARD.encode(&buf);
    debug!("Encoded image → {} bytes base64", b64.len());

    Ok(ImageData::new(b64, "image/png").with_detail("high"))
}

/// Encode a document's pages in order, skipping any page that fails.
pub fn encode_pages(images: &[DynamicImage]) -> Vec<ImageData> {
    images
        .iter()
        .enumerate()
        .filter_map(|(idx, img)| match encode_page(img) {
            Ok(data) => Some(data),
            Err(e) => {
                warn!("Failed to encode page {}: {}", idx + 1, e);
                None
            }
        })
        .collect()
}
