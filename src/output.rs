//! Output types: the consolidated dataset and the run summary.

use crate::record::{Event, Fragment, Issue, Project, Report};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The aggregate written at the end of a batch.
///
/// `project` is `None` only on the empty result of a batch whose project
/// could not be seeded; it serialises as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsolidatedDataset {
    pub project: Option<Project>,
    pub reports: Vec<Report>,
    pub issues: Vec<Issue>,
    pub events: Vec<Event>,
}

impl ConsolidatedDataset {
    /// Start a dataset for a seeded project.
    pub fn new(project: Project) -> Self {
        Self {
            project: Some(project),
            ..Self::default()
        }
    }

    /// Append one document's report and extend the flat issue/event lists.
    ///
    /// The fragment's project group is ignored; the dataset keeps the seeded
    /// one.
    pub fn merge(&mut self, fragment: Fragment) {
        self.reports.push(fragment.report);
        self.issues.extend(fragment.issues);
        self.events.extend(fragment.events);
    }

    /// `true` when nothing at all was consolidated.
    pub fn is_empty(&self) -> bool {
        self.project.is_none()
            && self.reports.is_empty()
            && self.issues.is_empty()
            && self.events.is_empty()
    }
}

/// Counts and timing for one consolidation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    /// Documents found by discovery.
    pub discovered: usize,
    /// Documents the report sweep ran on; always `succeeded + failed`.
    pub attempted: usize,
    /// Documents whose report was merged.
    pub succeeded: usize,
    /// Documents the report sweep got nothing from.
    pub failed: usize,
    /// Paths of the failed documents, in processing order.
    pub failed_documents: Vec<PathBuf>,
    /// The seeding document, when it yielded no project.
    pub seed_failed: Option<PathBuf>,
    /// `true` when no project was seeded and the dataset is empty.
    pub project_missing: bool,
    /// Wall-clock duration of the run.
    pub duration_ms: u64,
}

/// The result of [`crate::batch::BatchConsolidator::consolidate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidationOutput {
    pub dataset: ConsolidatedDataset,
    pub report: BatchReport,
}
