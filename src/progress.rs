//! Progress-callback trait for per-document batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::ExtractionConfigBuilder::progress_callback`] to receive
//! events as the Batch Consolidator seeds the project and sweeps the reports.
//! The CLI renders these with a progress bar; library callers can forward
//! them anywhere.
//!
//! # Example
//!
//! ```rust
//! use ivv_extract::{BatchProgressCallback, ExtractionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     failed: AtomicUsize,
//! }
//!
//! impl BatchProgressCallback for CountingCallback {
//!     fn on_document_error(&self, index: usize, total: usize, name: &str) {
//!         self.failed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{}/{} {} contributed nothing", index, total, name);
//!     }
//! }
//!
//! let config = ExtractionConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { failed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the Batch Consolidator as it works through the documents.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Indices are 1-based.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once after discovery.
    fn on_batch_start(&self, total_documents: usize) {
        let _ = total_documents;
    }

    /// Called after the project-seeding step; `project_name` is `None` when
    /// seeding failed and the batch is about to stop.
    fn on_project_seeded(&self, document: &str, project_name: Option<&str>) {
        let _ = (document, project_name);
    }

    /// Called before a document is rendered for the report sweep.
    fn on_document_start(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Called when a document's fragment was merged into the dataset.
    fn on_document_complete(&self, index: usize, total: usize, name: &str, issues: usize, events: usize) {
        let _ = (index, total, name, issues, events);
    }

    /// Called when a document contributed nothing.
    fn on_document_error(&self, index: usize, total: usize, name: &str) {
        let _ = (index, total, name);
    }

    /// Called once after the sweep.
    fn on_batch_complete(&self, attempted: usize, succeeded: usize) {
        let _ = (attempted, succeeded);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExtractionConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;
