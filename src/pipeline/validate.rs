//! Record validation: loose JSON in, schema-conformant [`Fragment`] out.
//!
//! This is the only place raw `serde_json::Value` is read. Every field is
//! coerced independently and a field that cannot be read degrades to `None`
//! (or `false` / an empty list); validation never fails as a whole.
//!
//! | Field kind | Accepted input | Otherwise |
//! |------------|----------------|-----------|
//! | enumerated | string or number, via [`canonicalize`] | `None` |
//! | text | string as-is; numbers and booleans stringified | `None` |
//! | amount | non-negative number, or numeric string without `$ , %` | `None` |
//! | progress | fraction in `[0, 1]`; `(1, 100]` read as a percentage | `None` |
//! | year | integer or integer string | `None` |
//! | timestamp | RFC 3339; offset-less date-time or bare date as UTC | `None` |
//! | flag | boolean or `"true"`/`"false"` | `false` |
//!
//! Entries of `issues` and `events` that are not objects are dropped.

use crate::record::{Event, Fragment, Issue, Project, Report, Shape};
use crate::registry::{canonicalize, Enumeration, IssueStatus, Likelihood, Month, ProjectStatus, Severity};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::{Map, Value};
use tracing::debug;

/// Validate a parsed model reply against `shape`.
///
/// Groups the shape does not expect are ignored and left empty. Expected
/// groups that are missing or of the wrong JSON type also come back empty.
pub fn validate(raw: &Map<String, Value>, shape: Shape) -> Fragment {
    let mut fragment = Fragment::default();

    if shape.expects_project() {
        if let Some(obj) = group_object(raw, "project") {
            fragment.project = validate_project(obj);
        }
    }

    if shape.expects_report() {
        if let Some(obj) = group_object(raw, "report") {
            fragment.report = validate_report(obj);
        }
        fragment.issues = objects_in(raw, "issues")
            .map(validate_issue)
            .collect();
        fragment.events = objects_in(raw, "events")
            .map(validate_event)
            .collect();
    }

    fragment
}

fn validate_project(obj: &Map<String, Value>) -> Project {
    Project {
        name: text(obj, "name"),
        description: text(obj, "description"),
        original_contract_award: amount(obj, "originalContractAward"),
        status: enumerated::<ProjectStatus>(obj, "status"),
    }
}

fn validate_report(obj: &Map<String, Value>) -> Report {
    Report {
        year_create: year(obj, "yearCreate"),
        month_create: enumerated::<Month>(obj, "monthCreate"),
        paid_up_to_now: amount(obj, "paidUpToNow"),
        progress: fraction(obj, "progress"),
        status: enumerated::<ProjectStatus>(obj, "status"),
    }
}

fn validate_issue(obj: &Map<String, Value>) -> Issue {
    Issue {
        title: text(obj, "title"),
        description: text(obj, "description"),
        remedy: text(obj, "remedy"),
        severity: enumerated::<Severity>(obj, "severity"),
        likelihood: enumerated::<Likelihood>(obj, "likelihood"),
        status: enumerated::<IssueStatus>(obj, "status"),
    }
}

fn validate_event(obj: &Map<String, Value>) -> Event {
    Event {
        name: text(obj, "name"),
        description: text(obj, "description"),
        planned_start: timestamp(obj, "plannedStart"),
        planned_end: timestamp(obj, "plannedEnd"),
        completed: flag(obj, "completed"),
        actual_start: timestamp(obj, "actualStart"),
        actual_end: timestamp(obj, "actualEnd"),
    }
}

// ── Group access ─────────────────────────────────────────────────────────

fn group_object<'a>(raw: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    match raw.get(key) {
        Some(Value::Object(obj)) => Some(obj),
        Some(Value::Null) | None => None,
        Some(other) => {
            debug!("'{}' is not an object ({}), using an empty group", key, type_name(other));
            None
        }
    }
}

/// The object entries of an array group, dropping anything else.
fn objects_in<'a>(
    raw: &'a Map<String, Value>,
    key: &'static str,
) -> impl Iterator<Item = &'a Map<String, Value>> + 'a {
    let entries: &[Value] = match raw.get(key) {
        Some(Value::Array(items)) => items,
        Some(Value::Null) | None => &[],
        Some(other) => {
            debug!("'{}' is not an array ({}), using an empty list", key, type_name(other));
            &[]
        }
    };

    entries.iter().enumerate().filter_map(move |(idx, entry)| match entry {
        Value::Object(obj) => Some(obj),
        other => {
            debug!("Dropping {}[{}]: expected an object, got {}", key, idx, type_name(other));
            None
        }
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ── Field coercion ───────────────────────────────────────────────────────

fn enumerated<E: Enumeration>(obj: &Map<String, Value>, key: &str) -> Option<E> {
    match obj.get(key)? {
        Value::String(s) => canonicalize::<E>(Some(s)),
        Value::Number(n) => canonicalize::<E>(Some(&n.to_string())),
        _ => None,
    }
}

fn text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| !matches!(c, '$' | ',' | '%') && !c.is_whitespace())
                .collect();
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    };
    n.filter(|n| n.is_finite())
}

fn amount(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    obj.get(key).and_then(number).filter(|n| *n >= 0.0)
}

fn fraction(obj: &Map<String, Value>, key: &str) -> Option<f64> {
    let n = obj.get(key).and_then(number)?;
    if (0.0..=1.0).contains(&n) {
        Some(n)
    } else if n > 1.0 && n <= 100.0 {
        Some(n / 100.0)
    } else {
        None
    }
}

fn year(obj: &Map<String, Value>, key: &str) -> Option<i32> {
    match obj.get(key)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .and_then(|y| i32::try_from(y).ok()),
        Value::String(s) => s.trim().parse::<i32>().ok(),
        _ => None,
    }
}

fn flag(obj: &Map<String, Value>, key: &str) -> bool {
    match obj.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn timestamp(obj: &Map<String, Value>, key: &str) -> Option<DateTime<FixedOffset>> {
    match obj.get(key)? {
        Value::String(s) => parse_timestamp(s.trim()),
        _ => None,
    }
}

/// Parse a timestamp; inputs without an offset are taken as UTC.
pub(crate) fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(Utc.from_utc_datetime(&naive).fixed_offset());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let naive = date.and_hms_opt(0, 0, 0)?;
        return Some(Utc.from_utc_datetime(&naive).fixed_offset());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test input must be an object"),
        }
    }

    #[test]
    fn missing_groups_become_empty() {
        let raw = obj(json!({ "report": { "yearCreate": 2024 } }));
        let fragment = validate(&raw, Shape::Full);
        assert!(fragment.issues.is_empty());
        assert!(fragment.events.is_empty());
        assert!(fragment.project.is_empty());
        assert_eq!(fragment.report.year_create, Some(2024));
    }

    #[test]
    fn enum_fields_are_canonicalised() {
        let raw = obj(json!({
            "project": { "name": "KOLEA", "status": "approved" },
            "report": { "monthCreate": "Sep", "status": "bogus" },
            "issues": [
                { "severity": "medium", "likelihood": "Low", "status": "closed" },
                { "severity": "catastrophic", "likelihood": "", "status": null }
            ]
        }));
        let f = validate(&raw, Shape::Full);
        assert_eq!(f.project.status, Some(ProjectStatus::Approved));
        assert_eq!(f.report.month_create, Some(Month::September));
        assert_eq!(f.report.status, Some(ProjectStatus::Pending));

        assert_eq!(f.issues[0].severity, Some(Severity::Medium));
        assert_eq!(f.issues[0].likelihood, Some(Likelihood::Low));
        assert_eq!(f.issues[0].status, Some(IssueStatus::Closed));

        assert_eq!(f.issues[1].severity, Some(Severity::High));
        assert_eq!(f.issues[1].likelihood, None);
        assert_eq!(f.issues[1].status, None);
    }

    #[test]
    fn unresolvable_month_is_none() {
        let raw = obj(json!({ "report": { "monthCreate": "Smarch" } }));
        assert_eq!(validate(&raw, Shape::ReportOnly).report.month_create, None);

        let raw = obj(json!({ "report": { "monthCreate": 5 } }));
        assert_eq!(validate(&raw, Shape::ReportOnly).report.month_create, Some(Month::May));

        let raw = obj(json!({ "report": { "monthCreate": 5.0 } }));
        assert_eq!(validate(&raw, Shape::ReportOnly).report.month_create, Some(Month::May));

        let raw = obj(json!({ "report": { "monthCreate": "09" } }));
        assert_eq!(validate(&raw, Shape::ReportOnly).report.month_create, Some(Month::September));
    }

    #[test]
    fn issue_text_is_kept_verbatim() {
        let raw = obj(json!({
            "issues": [{ "title": "", "description": "  Schedule risk ", "remedy": "Add staff" }]
        }));
        let issue = &validate(&raw, Shape::ReportOnly).issues[0];
        assert_eq!(issue.title.as_deref(), Some(""));
        assert_eq!(issue.description.as_deref(), Some("  Schedule risk "));
        assert_eq!(issue.remedy.as_deref(), Some("Add staff"));
    }

    #[test]
    fn non_object_entries_are_dropped() {
        let raw = obj(json!({
            "issues": ["just text", { "description": "real" }],
            "events": [42, null, { "name": "Go-live", "completed": true }, "x"]
        }));
        let f = validate(&raw, Shape::ReportOnly);
        assert_eq!(f.issues.len(), 1);
        assert_eq!(f.events.len(), 1);
        assert_eq!(f.events[0].name.as_deref(), Some("Go-live"));
        assert!(f.events[0].completed);
    }

    #[test]
    fn wrongly_typed_groups_are_empty() {
        let raw = obj(json!({ "project": "KOLEA", "report": [], "issues": {}, "events": "none" }));
        let f = validate(&raw, Shape::Full);
        assert_eq!(f, Fragment::default());
    }

    #[test]
    fn numbers_are_coerced() {
        let raw = obj(json!({
            "project": { "originalContractAward": "$1,234,567.50" },
            "report": { "yearCreate": "2023", "paidUpToNow": -5, "progress": "75%" }
        }));
        let f = validate(&raw, Shape::Full);
        assert_eq!(f.project.original_contract_award, Some(1234567.5));
        assert_eq!(f.report.year_create, Some(2023));
        assert_eq!(f.report.paid_up_to_now, None);
        assert_eq!(f.report.progress, Some(0.75));
    }

    #[test]
    fn progress_out_of_range_is_none() {
        let raw = obj(json!({ "report": { "progress": 250 } }));
        assert_eq!(validate(&raw, Shape::ReportOnly).report.progress, None);
        let raw = obj(json!({ "report": { "progress": 0.4 } }));
        assert_eq!(validate(&raw, Shape::ReportOnly).report.progress, Some(0.4));
    }

    #[test]
    fn timestamps_are_parsed_with_offsets() {
        let raw = obj(json!({
            "events": [{
                "plannedStart": "2024-01-01T00:00:00Z",
                "plannedEnd": "2024-03-31",
                "actualStart": "2024-01-15T09:30:00-10:00",
                "actualEnd": "sometime in spring"
            }]
        }));
        let e = &validate(&raw, Shape::ReportOnly).events[0];
        assert_eq!(e.planned_start.unwrap().to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert_eq!(e.planned_end.unwrap().to_rfc3339(), "2024-03-31T00:00:00+00:00");
        assert_eq!(e.actual_start.unwrap().offset().local_minus_utc(), -10 * 3600);
        assert_eq!(e.actual_end, None);
        assert!(!e.completed);
    }

    #[test]
    fn shape_selects_groups() {
        let raw = obj(json!({
            "project": { "name": "KOLEA" },
            "report": { "yearCreate": 2024 },
            "issues": [{ "description": "x" }]
        }));

        let report_only = validate(&raw, Shape::ReportOnly);
        assert!(report_only.project.is_empty());
        assert_eq!(report_only.issues.len(), 1);

        let project_only = validate(&raw, Shape::ProjectOnly);
        assert_eq!(project_only.project.name.as_deref(), Some("KOLEA"));
        assert_eq!(project_only.report, Report::default());
        assert!(project_only.issues.is_empty());
    }

    #[test]
    fn validation_is_a_fixed_point() {
        let raw = obj(json!({
            "project": {
                "name": "Benefits Modernization",
                "description": "Eligibility system replacement",
                "originalContractAward": "12,500,000",
                "status": "approved"
            },
            "report": {
                "yearCreate": 2024, "monthCreate": "mar",
                "paidUpToNow": 3250000.5, "progress": 40, "status": "Pending"
            },
            "issues": [{
                "title": "Testing Methodology Alignment", "description": "d", "remedy": "r",
                "severity": "low", "likelihood": "MEDIUM", "status": "open"
            }],
            "events": [{
                "name": "UAT", "description": "User acceptance testing",
                "plannedStart": "2024-02-01T00:00:00Z", "plannedEnd": "2024-04-30",
                "completed": "false", "actualStart": null, "actualEnd": null
            }]
        }));

        let first = validate(&raw, Shape::Full);
        let again = obj(serde_json::to_value(&first).unwrap());
        let second = validate(&again, Shape::Full);
        assert_eq!(first, second);
    }
}
