//! PDF rasterisation: render the first pages of a report to `DynamicImage`.
//!
//! Rendering sits behind the [`PageRenderer`] trait so the Document Processor
//! can be driven by a test double; [`PdfiumRenderer`] is the production
//! implementation.
//!
//! ## Threading
//!
//! `pdfium-render` wraps the pdfium C++ library, which is CPU-bound and not
//! async-aware, so each document renders inside `tokio::task::spawn_blocking`.
//!
//! ## Failure contract
//!
//! A renderer never errors: a document that cannot be opened or rendered
//! yields an empty vector, which the processor reports as
//! [`crate::error::DocumentError::UnrenderableDocument`].

use crate::config::ExtractionConfig;
use async_trait::async_trait;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Turns a document into an ordered sequence of page images.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Render at most `page_limit` pages (all when `None`), in page order.
    /// Returns an empty vector when the document cannot be rendered.
    async fn render(&self, path: &Path, page_limit: Option<usize>) -> Vec<DynamicImage>;
}

/// [`PageRenderer`] backed by pdfium.
///
/// The library is bound from `PDFIUM_LIB_PATH` when set, otherwise from the
/// system library search path.
#[derive(Debug, Clone)]
pub struct PdfiumRenderer {
    max_rendered_pixels: u32,
}

impl PdfiumRenderer {
    pub fn new(max_rendered_pixels: u32) -> Self {
        Self { max_rendered_pixels }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(config.max_rendered_pixels)
    }
}

#[async_trait]
impl PageRenderer for PdfiumRenderer {
    async fn render(&self, path: &Path, page_limit: Option<usize>) -> Vec<DynamicImage> {
        let owned: PathBuf = path.to_path_buf();
        let max_pixels = self.max_rendered_pixels;

        let result = tokio::task::spawn_blocking(move || {
            render_pages_blocking(&owned, max_pixels, page_limit)
        })
        .await;

        match result {
            Ok(Ok(images)) => images,
            Ok(Err(detail)) => {
                warn!("Error converting {}: {}", path.display(), detail);
                Vec::new()
            }
            Err(e) => {
                warn!("Render task for {} panicked: {}", path.display(), e);
                Vec::new()
            }
        }
    }
}

/// Bind to pdfium, preferring an explicit library path.
fn bind_pdfium() -> Result<Pdfium, String> {
    let bindings = match std::env::var("PDFIUM_LIB_PATH") {
        Ok(lib) if !lib.is_empty() => Pdfium::bind_to_library(&lib)
            .map_err(|e| format!("cannot load pdfium from '{}': {:?}", lib, e))?,
        _ => Pdfium::bind_to_system_library()
            .map_err(|e| format!("cannot load system pdfium: {:?}", e))?,
    };
    Ok(Pdfium::new(bindings))
}

/// Blocking implementation of page rendering.
fn render_pages_blocking(
    pdf_path: &Path,
    max_pixels: u32,
    page_limit: Option<usize>,
) -> Result<Vec<DynamicImage>, String> {
    let pdfium = bind_pdfium()?;

    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| format!("{:?}", e))?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    let count = page_limit.map_or(total_pages, |limit| limit.min(total_pages));
    info!(
        "{}: {} pages, rendering {}",
        pdf_path.display(),
        total_pages,
        count
    );

    let render_config = PdfRenderConfig::new()
        .set_target_width(max_pixels as i32)
        .set_maximum_height(max_pixels as i32);

    let mut images = Vec::with_capacity(count);
    for idx in 0..count {
        let page = pages
            .get(idx as u16)
            .map_err(|e| format!("page {}: {:?}", idx + 1, e))?;
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| format!("page {}: {:?}", idx + 1, e))?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );
        images.push(image);
    }

    Ok(images)
}
