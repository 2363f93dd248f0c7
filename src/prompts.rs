//! Instruction prompts for structured report extraction.
//!
//! Every prompt lives here so the wording can change without touching the
//! request or validation code, and so tests can check that each prompt names
//! the JSON groups its [`Shape`] expects.

use crate::record::Shape;

/// Full extraction: project, report, issues and events from one document.
pub const FULL_EXTRACTION_PROMPT: &str = r#"You are reading the page images of an Independent Verification and Validation (IV&V) report on a state IT project.

Return ONLY one JSON object with exactly this structure:

{
  "project": {
    "name": "string",
    "description": "string",
    "originalContractAward": 0.0,
    "status": "PENDING|DENIED|APPROVED"
  },
  "report": {
    "yearCreate": 2024,
    "monthCreate": "JANUARY|FEBRUARY|MARCH|APRIL|MAY|JUNE|JULY|AUGUST|SEPTEMBER|OCTOBER|NOVEMBER|DECEMBER",
    "paidUpToNow": 0.0,
    "progress": 0.0,
    "status": "PENDING|DENIED|APPROVED"
  },
  "issues": [
    {
      "title": "string",
      "description": "string",
      "remedy": "string",
      "severity": "HIGH|MEDIUM|LOW",
      "likelihood": "HIGH|MEDIUM|LOW",
      "status": "OPEN|CLOSED"
    }
  ],
  "events": [
    {
      "name": "string",
      "description": "string",
      "plannedStart": "2024-01-01T00:00:00Z",
      "plannedEnd": "2024-01-01T00:00:00Z",
      "completed": false,
      "actualStart": "2024-01-01T00:00:00Z",
      "actualEnd": "2024-01-01T00:00:00Z"
    }
  ]
}

Rules:
1. Amounts are plain numbers: no currency symbols, no thousands separators.
2. Progress is a fraction: 0.75 means 75%.
3. Dates are ISO 8601 with a timezone (YYYY-MM-DDTHH:mm:ssZ).
4. Use null for anything the report does not state.
5. List every issue and every event the report mentions.
6. Enumerated fields use exactly one of the listed values.
7. Output the JSON object only, with no commentary."#;

/// Project seeding: only the project group.
pub const PROJECT_PROMPT: &str = r#"You are reading the page images of an Independent Verification and Validation (IV&V) report on a state IT project.

Return ONLY one JSON object with exactly this structure:

{
  "project": {
    "name": "string",
    "description": "string",
    "originalContractAward": 0.0,
    "status": "PENDING|DENIED|APPROVED"
  }
}

The project name and description are usually in the executive summary or the
background section; the contract award is usually in the background section.

Rules:
1. Amounts are plain numbers: no currency symbols, no thousands separators.
2. Status uses exactly one of the listed values.
3. Output the JSON object only, with no commentary."#;

/// Report-only extraction: report, issues and events; no project.
pub const REPORT_PROMPT: &str = r#"You are reading the page images of an Independent Verification and Validation (IV&V) report on a state IT project.

Return ONLY one JSON object with exactly this structure:

{
  "report": {
    "yearCreate": 2024,
    "monthCreate": "JANUARY|FEBRUARY|MARCH|APRIL|MAY|JUNE|JULY|AUGUST|SEPTEMBER|OCTOBER|NOVEMBER|DECEMBER",
    "paidUpToNow": 0.0,
    "progress": 0.0,
    "status": "PENDING|DENIED|APPROVED"
  },
  "issues": [
    {
      "title": "string",
      "description": "string",
      "remedy": "string",
      "severity": "HIGH|MEDIUM|LOW",
      "likelihood": "HIGH|MEDIUM|LOW",
      "status": "OPEN|CLOSED"
    }
  ],
  "events": [
    {
      "name": "string",
      "description": "string",
      "plannedStart": "2024-01-01T00:00:00Z",
      "plannedEnd": "2024-01-01T00:00:00Z",
      "completed": false,
      "actualStart": "2024-01-01T00:00:00Z",
      "actualEnd": "2024-01-01T00:00:00Z"
    }
  ]
}

Look at the executive summary, the background, the IV&V dashboard and the
IV&V summary pages.

Rules:
1. List every issue and every event the report mentions.
2. Give each issue a short title (3–6 words) naming the main concern.
3. Amounts are plain numbers: no currency symbols, no thousands separators.
4. Progress is a fraction: 0.75 means 75%.
5. Dates are ISO 8601 with a timezone (YYYY-MM-DDTHH:mm:ssZ).
6. Enumerated fields use exactly one of the listed values.
7. Output the JSON object only, with no commentary."#;

/// Pick the instruction prompt for a shape.
pub fn prompt_for(shape: Shape) -> &'static str {
    match shape {
        Shape::Full => FULL_EXTRACTION_PROMPT,
        Shape::ReportOnly => REPORT_PROMPT,
        Shape::ProjectOnly => PROJECT_PROMPT,
    }
}

/// Build the text-only prompt asking for a short issue title.
pub fn issue_title_prompt(description: &str, remedy: &str) -> String {
    format!(
        "Write a short title (3 to 6 words) for the following project issue.\n\n\
         Description: {description}\n\
         Remedy: {remedy}\n\n\
         Reply with the title text only, without quotes or explanation.\n\
         Examples of good titles:\n\
         - Schedule Management Practices\n\
         - Interface Coordination Risk\n\
         - Testing Methodology Alignment"
    )
}
