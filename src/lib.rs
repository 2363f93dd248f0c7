//! # ivv-extract
//!
//! Turn a directory of monthly IV&V (Independent Verification and Validation)
//! report PDFs into one structured JSON dataset using Vision Language Models.
//!
//! Report PDFs mix narrative, dashboards and tables; text extraction loses
//! the layout that tells a risk rating from a milestone date. This crate
//! rasterises the first pages of each report and asks a vision model to read
//! them into a fixed schema, then validates every field before it reaches
//! the dataset.
//!
//! ## Pipeline Overview
//!
//! ```text
//! reports/*.pdf (sorted by name)
//!  │
//!  ├─ 1. Seed     last report → project identity (mandatory)
//!  ├─ 2. Sweep    every report → report + issues + events
//!  │     ├─ render    first 10 pages via pdfium (spawn_blocking)
//!  │     ├─ encode    PNG → base64 ImageData
//!  │     ├─ llm       one vision call per document
//!  │     ├─ parse     JSON object out of the free-form reply
//!  │     └─ validate  canonical enums, coerced numbers and dates
//!  └─ 3. Output   { project, reports, issues, events } written atomically
//! ```
//!
//! A report that cannot be rendered, whose call fails, or whose reply holds
//! no JSON is logged and skipped; the rest of the batch still contributes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ivv_extract::{consolidate_to_file, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider from OPENAI_API_KEY (model from OPENAI_MODEL, default gpt-4o)
//!     let config = ExtractionConfig::default();
//!     let report = consolidate_to_file("downloads/KOLEA 20", "parsed_jsons/kolea.json", &config).await?;
//!     eprintln!("{}/{} reports consolidated", report.succeeded, report.attempted);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `ivv-extract` binary (clap + anyhow + indicatif + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod output;
pub mod pipeline;
pub mod processor;
pub mod progress;
pub mod prompts;
pub mod record;
pub mod registry;
pub mod titles;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{discover_documents, document_sort_key, BatchConsolidator};
pub use config::{ExtractionConfig, ExtractionConfigBuilder, DEFAULT_MODEL};
pub use error::{DocumentError, ExtractError};
pub use extract::{
    backfill_titles_in_file, consolidate_directory, consolidate_to_file, default_processor,
    extract_document, extract_document_to_file, read_dataset, write_consolidation,
    write_json_atomic,
};
pub use fetch::{
    download_all, extract_pdf_links, group_by_prefix, links_from_file, sanitize_filename,
    FetchOptions, FetchSummary, PdfLink, PrefixGroup,
};
pub use output::{BatchReport, ConsolidatedDataset, ConsolidationOutput};
pub use pipeline::llm::{ExtractionClient, VisionClient};
pub use pipeline::parse::extract_json;
pub use pipeline::render::{PageRenderer, PdfiumRenderer};
pub use pipeline::validate::validate;
pub use processor::DocumentProcessor;
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use record::{Event, Fragment, Issue, Project, Report, Shape};
pub use registry::{
    canonicalize, Enumeration, IssueStatus, Likelihood, Month, ProjectStatus, Severity,
};
pub use titles::backfill_titles;
