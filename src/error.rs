//! Error types for the ivv-extract library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ExtractError`]: **Fatal**. The run cannot produce its output at all
//!   (input directory missing, provider not configured, project identity
//!   could not be seeded, output not writable). Returned as
//!   `Err(ExtractError)` from the top-level functions in [`crate::extract`].
//!
//! * [`DocumentError`]: **Non-fatal**. A single document contributed nothing
//!   (no pages rendered, the service call failed, the reply held no JSON).
//!   The batch logs it, counts it and moves on to the next document.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the ivv-extract library.
///
/// Document-level failures use [`DocumentError`] and never abort a batch.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The directory to scan for reports does not exist or is unreadable.
    #[error("Report directory not found: '{path}'\nCheck the path exists and is readable.")]
    DirectoryNotFound { path: PathBuf },

    /// An input file (dataset or saved listing page) could not be read.
    #[error("Failed to read '{path}': {detail}")]
    ReadFailed { path: PathBuf, detail: String },

    // ── Extraction errors ─────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Project seeding failed; no dataset can be produced without a project.
    #[error("Could not extract project information from '{path}'")]
    MissingProjectIdentity { path: PathBuf },

    /// Single-document mode: the document contributed nothing.
    #[error("No data could be extracted from '{path}'")]
    DocumentFailed { path: PathBuf },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output JSON file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not serialise a dataset to JSON.
    #[error("Failed to serialise dataset: {0}")]
    Serialization(#[from] serde_json::Error),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single document.
///
/// The Document Processor turns every one of these into "this document
/// contributed nothing"; the variant only matters for the log line.
#[derive(Debug, Clone, Error)]
pub enum DocumentError {
    /// Rendering produced zero page images.
    #[error("'{path}': no pages could be rendered")]
    UnrenderableDocument { path: PathBuf },

    /// The network call to the extraction service failed.
    #[error("transport error: {detail}")]
    Transport { detail: String },

    /// The extraction service answered with an error.
    #[error("service error: {detail}")]
    Service { detail: String },

    /// The reply contained no parsable JSON object.
    #[error("malformed response: {reason}")]
    MalformedResponse { reason: String, raw: String },
}

impl DocumentError {
    /// Classify a provider error message as transport- or service-level.
    ///
    /// Provider crates surface both as one error type, so the distinction is
    /// made from the message wording.
    pub fn from_provider_message(detail: impl Into<String>) -> Self {
        let detail = detail.into();
        let lower = detail.to_lowercase();
        let transport = ["connect", "timed out", "timeout", "network", "dns", "broken pipe"]
            .iter()
            .any(|needle| lower.contains(needle));
        if transport {
            DocumentError::Transport { detail }
        } else {
            DocumentError::Service { detail }
        }
    }
}
