//! Batch Consolidator: many report PDFs in, one dataset out.
//!
//! A run has three strictly ordered phases:
//!
//! 1. **Discovery**: `*.pdf` in the input directory, sorted by
//!    [`document_sort_key`]. Report files are date-prefixed, so filename order
//!    is chronological order.
//! 2. **Project seeding**: the last (most recent) document is processed with
//!    [`Shape::ProjectOnly`]. Without a project there is no dataset: a failed
//!    seeding ends the run with an empty result.
//! 3. **Report sweep**: every document, the seeding one included, is
//!    processed with [`Shape::ReportOnly`]. A document that yields nothing is
//!    logged, counted and skipped; the sweep always visits every document
//!    exactly once.
//!
//! Documents are processed one at a time. Only one document's page images
//! are held in memory at any point.

use crate::error::ExtractError;
use crate::output::{BatchReport, ConsolidatedDataset, ConsolidationOutput};
use crate::processor::DocumentProcessor;
use crate::progress::ProgressCallback;
use crate::record::Shape;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, warn};

/// List the `*.pdf` files directly inside `dir`, in processing order.
///
/// The extension match is case-insensitive. Subdirectories are not searched.
pub fn discover_documents(dir: &Path) -> Result<Vec<PathBuf>, ExtractError> {
    let not_found = || ExtractError::DirectoryNotFound {
        path: dir.to_path_buf(),
    };
    if !dir.is_dir() {
        return Err(not_found());
    }

    let mut documents: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|_| not_found())?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_pdf(p))
        .collect();

    documents.sort_by_key(|p| document_sort_key(p));
    info!("Found {} PDF files in {}", documents.len(), dir.display());
    Ok(documents)
}

/// Ordering key for a report document: its file name.
pub fn document_sort_key(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub(crate) fn is_pdf(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

fn display_name(path: &Path) -> String {
    document_sort_key(path)
}

/// Drives the seeding and sweep phases over an ordered document list.
pub struct BatchConsolidator {
    processor: DocumentProcessor,
}

impl BatchConsolidator {
    pub fn new(processor: DocumentProcessor) -> Self {
        Self { processor }
    }

    /// Consolidate `documents`, which must already be in processing order.
    ///
    /// Never fails: a missing project is reported through
    /// [`BatchReport::project_missing`] alongside an empty dataset.
    pub async fn consolidate(&self, documents: &[PathBuf]) -> ConsolidationOutput {
        let start = Instant::now();
        let config = self.processor.config();
        let page_limit = config.page_limit;
        let callback: Option<&ProgressCallback> = config.progress_callback.as_ref();

        let mut report = BatchReport {
            discovered: documents.len(),
            ..BatchReport::default()
        };

        if let Some(cb) = callback {
            cb.on_batch_start(documents.len());
        }

        // ── Phase 1: project seeding ─────────────────────────────────────
        let Some(seed_doc) = documents.last() else {
            warn!("No documents to consolidate");
            report.project_missing = true;
            report.duration_ms = start.elapsed().as_millis() as u64;
            if let Some(cb) = callback {
                cb.on_batch_complete(0, 0);
            }
            return ConsolidationOutput {
                dataset: ConsolidatedDataset::default(),
                report,
            };
        };

        info!("Extracting project information from {}", display_name(seed_doc));
        let project = self
            .processor
            .process(seed_doc, page_limit, Shape::ProjectOnly)
            .await
            .map(|fragment| fragment.project)
            .filter(|project| !project.is_empty());

        if let Some(cb) = callback {
            cb.on_project_seeded(
                &display_name(seed_doc),
                project.as_ref().and_then(|p| p.name.as_deref()),
            );
        }

        let Some(project) = project else {
            error!(
                "Failed to extract project information from {}; no dataset produced",
                display_name(seed_doc)
            );
            report.project_missing = true;
            report.seed_failed = Some(seed_doc.clone());
            report.duration_ms = start.elapsed().as_millis() as u64;
            if let Some(cb) = callback {
                cb.on_batch_complete(0, 0);
            }
            return ConsolidationOutput {
                dataset: ConsolidatedDataset::default(),
                report,
            };
        };

        // ── Phase 2: report sweep ────────────────────────────────────────
        let mut dataset = ConsolidatedDataset::new(project);
        let total = documents.len();

        for (idx, path) in documents.iter().enumerate() {
            let index = idx + 1;
            let name = display_name(path);
            info!("Processing {}/{}: {}", index, total, name);
            if let Some(cb) = callback {
                cb.on_document_start(index, total, &name);
            }

            report.attempted += 1;
            match self.processor.process(path, page_limit, Shape::ReportOnly).await {
                Some(fragment) => {
                    let (issues, events) = (fragment.issues.len(), fragment.events.len());
                    dataset.merge(fragment);
                    report.succeeded += 1;
                    if let Some(cb) = callback {
                        cb.on_document_complete(index, total, &name, issues, events);
                    }
                }
                None => {
                    warn!("Failed to process {}", name);
                    report.failed += 1;
                    report.failed_documents.push(path.clone());
                    if let Some(cb) = callback {
                        cb.on_document_error(index, total, &name);
                    }
                }
            }
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            "Consolidated {}/{} reports ({} issues, {} events) in {}ms",
            report.succeeded,
            report.attempted,
            dataset.issues.len(),
            dataset.events.len(),
            report.duration_ms
        );
        if let Some(cb) = callback {
            cb.on_batch_complete(report.attempted, report.succeeded);
        }

        ConsolidationOutput { dataset, report }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn discovery_sorts_by_filename_and_skips_other_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["2024-03 report.pdf", "2023-11 report.PDF", "notes.txt", "2024-01 report.pdf"] {
            fs::write(dir.path().join(name), b"%PDF").unwrap();
        }
        fs::create_dir(dir.path().join("nested.pdf")).unwrap();

        let names: Vec<String> = discover_documents(dir.path())
            .unwrap()
            .iter()
            .map(|p| document_sort_key(p))
            .collect();
        assert_eq!(
            names,
            vec!["2023-11 report.PDF", "2024-01 report.pdf", "2024-03 report.pdf"]
        );
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover_documents(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, ExtractError::DirectoryNotFound { .. }));
    }
}
