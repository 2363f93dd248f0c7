//! Strictly-typed records produced by the Record Validator.
//!
//! Raw model output is held as `serde_json::Value` only until it reaches
//! [`crate::pipeline::validate`]; everything past that boundary is one of the
//! types below. Field names serialise in the camelCase form used by the
//! downstream project-tracking schema (`originalContractAward`,
//! `monthCreate`, `plannedStart`, ...), enumerated fields as their canonical
//! upper-case token.

use crate::registry::{IssueStatus, Likelihood, Month, ProjectStatus, Severity};
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// The project a set of reports belongs to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Project {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Award amount, no currency symbol or separators.
    pub original_contract_award: Option<f64>,
    pub status: Option<ProjectStatus>,
}

impl Project {
    /// `true` when no field was extracted.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.original_contract_award.is_none()
            && self.status.is_none()
    }
}

/// One monthly report; one per source document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Report {
    pub year_create: Option<i32>,
    pub month_create: Option<Month>,
    /// Cumulative amount paid so far.
    pub paid_up_to_now: Option<f64>,
    /// Fraction in `[0, 1]`.
    pub progress: Option<f64>,
    pub status: Option<ProjectStatus>,
}

/// A risk or finding raised in a report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Issue {
    pub title: Option<String>,
    pub description: Option<String>,
    pub remedy: Option<String>,
    pub severity: Option<Severity>,
    pub likelihood: Option<Likelihood>,
    pub status: Option<IssueStatus>,
}

/// A scheduled project milestone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Event {
    pub name: Option<String>,
    pub description: Option<String>,
    pub planned_start: Option<DateTime<FixedOffset>>,
    pub planned_end: Option<DateTime<FixedOffset>>,
    pub completed: bool,
    pub actual_start: Option<DateTime<FixedOffset>>,
    pub actual_end: Option<DateTime<FixedOffset>>,
}

/// The validated output for one document.
///
/// All four groups are always present; groups the [`Shape`] did not ask for
/// are left at their empty default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fragment {
    pub project: Project,
    pub report: Report,
    pub issues: Vec<Issue>,
    pub events: Vec<Event>,
}

/// Which top-level groups an extraction request expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Shape {
    /// project + report + issues + events (single-document mode).
    Full,
    /// report + issues + events; the project is seeded once per batch.
    ReportOnly,
    /// project only; used to seed a batch.
    ProjectOnly,
}

impl Shape {
    /// Whether the `project` group is read from the model output.
    pub fn expects_project(self) -> bool {
        matches!(self, Shape::Full | Shape::ProjectOnly)
    }

    /// Whether the `report`, `issues` and `events` groups are read.
    pub fn expects_report(self) -> bool {
        matches!(self, Shape::Full | Shape::ReportOnly)
    }
}
