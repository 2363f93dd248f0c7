//! Top-level entry points.
//!
//! These wire the production collaborators (pdfium rendering, a vision model
//! through `edgequake-llm`) into the [`DocumentProcessor`] and
//! [`BatchConsolidator`], and own all JSON file output.
//!
//! Every file written here goes through [`write_json_atomic`]: a temp file in
//! the destination directory, renamed over the target once complete, so a
//! reader never sees a partial dataset.

use crate::batch::{discover_documents, BatchConsolidator};
use crate::config::ExtractionConfig;
use crate::error::ExtractError;
use crate::output::{BatchReport, ConsolidatedDataset, ConsolidationOutput};
use crate::pipeline::llm::VisionClient;
use crate::pipeline::render::PdfiumRenderer;
use crate::processor::DocumentProcessor;
use crate::record::{Fragment, Shape};
use crate::titles::backfill_titles;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Build a processor over pdfium and the provider `config` resolves to.
///
/// # Errors
/// [`ExtractError::ProviderNotConfigured`] when no provider can be resolved.
pub fn default_processor(config: &ExtractionConfig) -> Result<DocumentProcessor, ExtractError> {
    let client = VisionClient::from_config(config)?;
    Ok(DocumentProcessor::new(
        Arc::new(PdfiumRenderer::from_config(config)),
        Arc::new(client),
        config.clone(),
    ))
}

/// Consolidate every `*.pdf` in `dir` into one dataset.
///
/// # Returns
/// `Ok` even when the project could not be seeded; check
/// `output.report.project_missing`.
///
/// # Errors
/// [`ExtractError::DirectoryNotFound`] or
/// [`ExtractError::ProviderNotConfigured`].
pub async fn consolidate_directory(
    dir: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<ConsolidationOutput, ExtractError> {
    let documents = discover_documents(dir.as_ref())?;
    let processor = default_processor(config)?;
    Ok(BatchConsolidator::new(processor).consolidate(&documents).await)
}

/// Consolidate `dir` and write the dataset to `output_path`.
///
/// Nothing is written when the project could not be seeded.
///
/// # Errors
/// Everything [`consolidate_directory`] returns, plus
/// [`ExtractError::MissingProjectIdentity`] and write failures.
pub async fn consolidate_to_file(
    dir: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<BatchReport, ExtractError> {
    let output = consolidate_directory(dir.as_ref(), config).await?;
    write_consolidation(&output, dir.as_ref(), output_path.as_ref())?;
    Ok(output.report)
}

/// Write a finished consolidation, refusing an unseeded one.
pub fn write_consolidation(
    output: &ConsolidationOutput,
    dir: &Path,
    output_path: &Path,
) -> Result<(), ExtractError> {
    if output.report.project_missing {
        let path = output
            .report
            .seed_failed
            .clone()
            .unwrap_or_else(|| dir.to_path_buf());
        return Err(ExtractError::MissingProjectIdentity { path });
    }

    write_json_atomic(output_path, &output.dataset)?;
    info!(
        "Saved {} reports, {} issues, {} events to {}",
        output.dataset.reports.len(),
        output.dataset.issues.len(),
        output.dataset.events.len(),
        output_path.display()
    );
    Ok(())
}

/// Extract project, report, issues and events from a single document.
///
/// # Errors
/// [`ExtractError::DocumentFailed`] when the document contributes nothing.
pub async fn extract_document(
    path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<Fragment, ExtractError> {
    let path = path.as_ref();
    let processor = default_processor(config)?;
    processor
        .process(path, config.page_limit, Shape::Full)
        .await
        .ok_or_else(|| ExtractError::DocumentFailed {
            path: path.to_path_buf(),
        })
}

/// [`extract_document`] and write the fragment to `output_path`.
pub async fn extract_document_to_file(
    path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<Fragment, ExtractError> {
    let fragment = extract_document(path, config).await?;
    write_json_atomic(output_path.as_ref(), &fragment)?;
    Ok(fragment)
}

/// Read a dataset written by [`consolidate_to_file`].
pub fn read_dataset(path: &Path) -> Result<ConsolidatedDataset, ExtractError> {
    let read_failed = |detail: String| ExtractError::ReadFailed {
        path: path.to_path_buf(),
        detail,
    };
    let text = std::fs::read_to_string(path).map_err(|e| read_failed(e.to_string()))?;
    serde_json::from_str(&text).map_err(|e| read_failed(e.to_string()))
}

/// Generate missing issue titles in a saved dataset.
///
/// Reads `input_path`, fills the titles, and writes the result to
/// `output_path` (which may be the same file). Returns the number of titles
/// written.
pub async fn backfill_titles_in_file(
    input_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<usize, ExtractError> {
    let input_path = input_path.as_ref();
    let mut dataset = read_dataset(input_path)?;
    info!("Loaded {} issues from {}", dataset.issues.len(), input_path.display());

    let client = VisionClient::from_config(config)?;
    let written = backfill_titles(&mut dataset, &client, config).await;

    write_json_atomic(output_path.as_ref(), &dataset)?;
    info!("Updated dataset saved to {}", output_path.as_ref().display());
    Ok(written)
}

/// Serialise `value` as pretty JSON and replace `path` atomically.
///
/// Parent directories are created as needed.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), ExtractError> {
    let write_failed = |source: std::io::Error| ExtractError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let json = serde_json::to_string_pretty(value)?;

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(write_failed)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(write_failed)?;
    tmp.write_all(json.as_bytes()).map_err(write_failed)?;
    tmp.write_all(b"\n").map_err(write_failed)?;
    tmp.persist(path).map_err(|e| write_failed(e.error))?;
    Ok(())
}
