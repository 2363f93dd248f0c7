//! Document Processor: one PDF in, one validated [`Fragment`] or nothing out.
//!
//! ```text
//! render ─▶ encode ─▶ submit ─▶ extract_json ─▶ validate
//!   │                   │            │
//!   └─ no pages         └─ failed    └─ malformed
//!          ╲                 │              ╱
//!           ─────────▶  None (logged)  ◀───
//! ```
//!
//! Callers of [`DocumentProcessor::process`] only ever see "this document
//! contributed nothing"; the cause is in the log. [`DocumentProcessor::try_process`]
//! keeps the [`DocumentError`] for callers that want it.

use crate::config::ExtractionConfig;
use crate::error::DocumentError;
use crate::pipeline::encode::encode_pages;
use crate::pipeline::llm::ExtractionClient;
use crate::pipeline::parse::extract_json;
use crate::pipeline::render::PageRenderer;
use crate::pipeline::validate::validate;
use crate::prompts::prompt_for;
use crate::record::{Fragment, Shape};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Runs the render → submit → parse → validate chain for single documents.
#[derive(Clone)]
pub struct DocumentProcessor {
    renderer: Arc<dyn PageRenderer>,
    client: Arc<dyn ExtractionClient>,
    config: ExtractionConfig,
}

impl DocumentProcessor {
    pub fn new(
        renderer: Arc<dyn PageRenderer>,
        client: Arc<dyn ExtractionClient>,
        config: ExtractionConfig,
    ) -> Self {
        Self {
            renderer,
            client,
            config,
        }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Process one document, logging and swallowing any failure.
    pub async fn process(&self, path: &Path, page_limit: Option<usize>, shape: Shape) -> Option<Fragment> {
        match self.try_process(path, page_limit, shape).await {
            Ok(fragment) => Some(fragment),
            Err(e) => {
                if let DocumentError::MalformedResponse { ref raw, .. } = e {
                    debug!("Raw reply for {}:\n{}", path.display(), raw);
                }
                warn!("Error processing {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Process one document, returning the reason when it contributes nothing.
    pub async fn try_process(
        &self,
        path: &Path,
        page_limit: Option<usize>,
        shape: Shape,
    ) -> Result<Fragment, DocumentError> {
        let start = Instant::now();

        let pages = self.renderer.render(path, page_limit).await;
        let images = encode_pages(&pages);
        // Rendered pages are not needed past this point.
        drop(pages);
        if images.is_empty() {
            return Err(DocumentError::UnrenderableDocument {
                path: path.to_path_buf(),
            });
        }

        let max_tokens = match shape {
            Shape::ProjectOnly => self.config.project_max_tokens,
            Shape::Full | Shape::ReportOnly => self.config.max_tokens,
        };

        debug!(
            "Submitting {} ({} pages, {:?}, budget {})",
            path.display(),
            images.len(),
            shape,
            max_tokens
        );
        let reply = self
            .client
            .submit(prompt_for(shape), &images, max_tokens, self.config.temperature)
            .await?;

        let raw = extract_json(&reply)?;
        let fragment = validate(&raw, shape);

        info!(
            "Processed {} in {}ms: {} issues, {} events",
            path.display(),
            start.elapsed().as_millis(),
            fragment.issues.len(),
            fragment.events.len()
        );
        Ok(fragment)
    }
}
