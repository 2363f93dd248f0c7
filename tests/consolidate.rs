//! Batch consolidation tests.
//!
//! The renderer and extraction client are in-test doubles, so these run
//! without pdfium, network access or API keys.

use async_trait::async_trait;
use edgequake_llm::ImageData;
use image::{DynamicImage, RgbaImage};
use ivv_extract::{
    discover_documents, prompts, write_consolidation, BatchConsolidator, BatchProgressCallback,
    DocumentError, DocumentProcessor, ExtractError, ExtractionClient, ExtractionConfig, Month,
    PageRenderer, ProjectStatus, Severity,
};
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Test doubles ─────────────────────────────────────────────────────────────

/// Renders two blank pages, or none for the listed file names.
#[derive(Default)]
struct StubRenderer {
    unrenderable: HashSet<String>,
    rendered: Mutex<Vec<String>>,
}

impl StubRenderer {
    fn failing_on(names: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            unrenderable: names.iter().map(|n| n.to_string()).collect(),
            rendered: Mutex::new(Vec::new()),
        })
    }

    fn rendered(&self) -> Vec<String> {
        self.rendered.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageRenderer for StubRenderer {
    async fn render(&self, path: &Path, _page_limit: Option<usize>) -> Vec<DynamicImage> {
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        self.rendered.lock().unwrap().push(name.clone());
        if self.unrenderable.contains(&name) {
            return Vec::new();
        }
        vec![
            DynamicImage::ImageRgba8(RgbaImage::new(8, 8)),
            DynamicImage::ImageRgba8(RgbaImage::new(8, 8)),
        ]
    }
}

/// Answers the project prompt with a fixed reply and report prompts from a
/// queue, in call order.
struct ScriptedClient {
    project_reply: String,
    report_replies: Mutex<VecDeque<Result<String, DocumentError>>>,
    calls: AtomicUsize,
}

impl ScriptedClient {
    fn new(project_reply: &str, report_replies: Vec<Result<String, DocumentError>>) -> Arc<Self> {
        Arc::new(Self {
            project_reply: project_reply.to_string(),
            report_replies: Mutex::new(report_replies.into()),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl ExtractionClient for ScriptedClient {
    async fn submit(
        &self,
        prompt: &str,
        images: &[ImageData],
        _max_tokens: usize,
        _temperature: f32,
    ) -> Result<String, DocumentError> {
        assert!(!images.is_empty(), "client called without page images");
        self.calls.fetch_add(1, Ordering::SeqCst);
        if prompt == prompts::PROJECT_PROMPT {
            return Ok(self.project_reply.clone());
        }
        assert_eq!(prompt, prompts::REPORT_PROMPT);
        self.report_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(DocumentError::Service {
                detail: "no scripted reply left".into(),
            }))
    }
}

#[derive(Default)]
struct CountingCallback {
    started: AtomicUsize,
    completed: AtomicUsize,
    errors: AtomicUsize,
    seeded: Mutex<Option<String>>,
    finished: Mutex<Option<(usize, usize)>>,
}

impl BatchProgressCallback for CountingCallback {
    fn on_project_seeded(&self, _document: &str, project_name: Option<&str>) {
        *self.seeded.lock().unwrap() = project_name.map(str::to_string);
    }

    fn on_document_start(&self, _index: usize, _total: usize, _name: &str) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn on_document_complete(&self, _i: usize, _t: usize, _n: &str, _issues: usize, _events: usize) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }

    fn on_document_error(&self, _index: usize, _total: usize, _name: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }

    fn on_batch_complete(&self, attempted: usize, succeeded: usize) {
        *self.finished.lock().unwrap() = Some((attempted, succeeded));
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

const PROJECT_REPLY: &str = r#"Here is the project:
```json
{"project": {"name": "KOLEA", "description": "Medicaid eligibility system",
             "originalContractAward": "$12,000,000", "status": "approved"}}
```"#;

fn report_reply(month: &str, issues: usize) -> Result<String, DocumentError> {
    let issues: Vec<String> = (0..issues)
        .map(|i| format!(r#"{{"description": "issue {i}", "severity": "medium"}}"#))
        .collect();
    Ok(format!(
        r#"{{"report": {{"yearCreate": 2024, "monthCreate": "{month}", "progress": 0.5}},
            "issues": [{}],
            "events": [{{"name": "UAT", "completed": "false"}}]}}"#,
        issues.join(",")
    ))
}

fn paths(names: &[&str]) -> Vec<PathBuf> {
    names.iter().map(|n| PathBuf::from("reports").join(n)).collect()
}

fn consolidator(
    renderer: Arc<StubRenderer>,
    client: Arc<ScriptedClient>,
    config: ExtractionConfig,
) -> BatchConsolidator {
    BatchConsolidator::new(DocumentProcessor::new(renderer, client, config))
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn unrenderable_document_is_skipped_not_fatal() {
    let renderer = StubRenderer::failing_on(&["2024-02.pdf"]);
    let client = ScriptedClient::new(
        PROJECT_REPLY,
        vec![report_reply("jan", 2), report_reply("3", 1)],
    );
    let docs = paths(&["2024-01.pdf", "2024-02.pdf", "2024-03.pdf"]);

    let out = consolidator(renderer, client, ExtractionConfig::default())
        .consolidate(&docs)
        .await;

    assert!(!out.report.project_missing);
    assert_eq!(out.report.attempted, 3);
    assert_eq!(out.report.succeeded, 2);
    assert_eq!(out.report.failed, 1);
    assert_eq!(out.report.failed_documents, vec![docs[1].clone()]);
    assert_eq!(out.report.seed_failed, None);

    let ds = &out.dataset;
    let project = ds.project.as_ref().unwrap();
    assert_eq!(project.name.as_deref(), Some("KOLEA"));
    assert_eq!(project.original_contract_award, Some(12_000_000.0));
    assert_eq!(project.status, Some(ProjectStatus::Approved));

    assert_eq!(ds.reports.len(), 2);
    assert_eq!(ds.reports[0].month_create, Some(Month::January));
    assert_eq!(ds.reports[1].month_create, Some(Month::March));
    assert_eq!(ds.issues.len(), 3);
    assert!(ds.issues.iter().all(|i| i.severity == Some(Severity::Medium)));
    assert_eq!(ds.events.len(), 2);
}

#[tokio::test]
async fn failed_seeding_yields_empty_dataset() {
    let renderer = StubRenderer::failing_on(&[]);
    let client = ScriptedClient::new(
        "I could not find any project information.",
        vec![report_reply("jan", 1), report_reply("feb", 1)],
    );
    let docs = paths(&["2024-01.pdf", "2024-02.pdf"]);

    let out = consolidator(renderer.clone(), client.clone(), ExtractionConfig::default())
        .consolidate(&docs)
        .await;

    assert!(out.report.project_missing);
    assert!(out.dataset.project.is_none());
    assert!(out.dataset.reports.is_empty());
    assert!(out.dataset.issues.is_empty());
    assert!(out.dataset.events.is_empty());
    assert_eq!(out.report.discovered, 2);
    assert_eq!(out.report.attempted, 0);
    assert_eq!(out.report.failed, 0);
    assert_eq!(out.report.attempted, out.report.succeeded + out.report.failed);
    assert!(out.report.failed_documents.is_empty());
    assert_eq!(out.report.seed_failed, Some(docs[1].clone()));

    // Only the seeding document was touched.
    assert_eq!(renderer.rendered(), vec!["2024-02.pdf"]);
    assert_eq!(client.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn empty_project_group_counts_as_failed_seeding() {
    let renderer = StubRenderer::failing_on(&[]);
    let client = ScriptedClient::new(r#"{"project": {}}"#, vec![report_reply("jan", 0)]);

    let out = consolidator(renderer, client, ExtractionConfig::default())
        .consolidate(&paths(&["2024-01.pdf"]))
        .await;

    assert!(out.report.project_missing);
    assert!(out.dataset.is_empty());
}

#[tokio::test]
async fn seeding_uses_last_document_then_sweeps_in_order() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["2024-03 Report.pdf", "2023-12 Report.pdf", "2024-01 Report.pdf"] {
        std::fs::write(dir.path().join(name), b"%PDF-1.7").unwrap();
    }
    let docs = discover_documents(dir.path()).unwrap();

    let renderer = StubRenderer::failing_on(&[]);
    let client = ScriptedClient::new(
        PROJECT_REPLY,
        vec![
            report_reply("december", 0),
            report_reply("january", 0),
            report_reply("march", 0),
        ],
    );

    let out = consolidator(renderer.clone(), client, ExtractionConfig::default())
        .consolidate(&docs)
        .await;

    assert_eq!(
        renderer.rendered(),
        vec![
            "2024-03 Report.pdf",
            "2023-12 Report.pdf",
            "2024-01 Report.pdf",
            "2024-03 Report.pdf",
        ]
    );
    let months: Vec<_> = out.dataset.reports.iter().map(|r| r.month_create).collect();
    assert_eq!(
        months,
        vec![Some(Month::December), Some(Month::January), Some(Month::March)]
    );
}

#[tokio::test]
async fn malformed_and_failed_replies_do_not_stop_the_sweep() {
    let renderer = StubRenderer::failing_on(&[]);
    let client = ScriptedClient::new(
        PROJECT_REPLY,
        vec![
            Ok("The pages are unreadable.".into()),
            Err(DocumentError::Transport {
                detail: "connection reset".into(),
            }),
            report_reply("may", 1),
        ],
    );
    let callback = Arc::new(CountingCallback::default());
    let config = ExtractionConfig::builder()
        .progress_callback(callback.clone())
        .build()
        .unwrap();

    let out = consolidator(renderer, client, config)
        .consolidate(&paths(&["a.pdf", "b.pdf", "c.pdf"]))
        .await;

    assert_eq!(out.report.succeeded, 1);
    assert_eq!(out.report.failed, 2);
    assert_eq!(out.dataset.reports.len(), 1);
    assert_eq!(out.dataset.reports[0].month_create, Some(Month::May));

    assert_eq!(callback.seeded.lock().unwrap().as_deref(), Some("KOLEA"));
    assert_eq!(callback.started.load(Ordering::SeqCst), 3);
    assert_eq!(callback.completed.load(Ordering::SeqCst), 1);
    assert_eq!(callback.errors.load(Ordering::SeqCst), 2);
    assert_eq!(*callback.finished.lock().unwrap(), Some((3, 1)));
}

#[tokio::test]
async fn no_documents_means_no_project() {
    let renderer = StubRenderer::failing_on(&[]);
    let client = ScriptedClient::new(PROJECT_REPLY, vec![]);

    let out = consolidator(renderer, client.clone(), ExtractionConfig::default())
        .consolidate(&[])
        .await;

    assert!(out.report.project_missing);
    assert_eq!(out.report.discovered, 0);
    assert_eq!(client.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn written_dataset_has_the_four_groups() {
    let renderer = StubRenderer::failing_on(&[]);
    let client = ScriptedClient::new(PROJECT_REPLY, vec![report_reply("feb", 1)]);
    let out = consolidator(renderer, client, ExtractionConfig::default())
        .consolidate(&paths(&["2024-02.pdf"]))
        .await;

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("parsed_jsons/kolea_complete_dataset.json");
    write_consolidation(&out, dir.path(), &target).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&target).unwrap()).unwrap();
    assert_eq!(json["project"]["name"], "KOLEA");
    assert_eq!(json["project"]["status"], "APPROVED");
    assert_eq!(json["reports"][0]["monthCreate"], "FEBRUARY");
    assert_eq!(json["issues"][0]["severity"], "MEDIUM");
    assert_eq!(json["events"][0]["completed"], false);
}

#[tokio::test]
async fn unseeded_run_is_not_written() {
    let renderer = StubRenderer::failing_on(&["2024-02.pdf"]);
    let client = ScriptedClient::new(PROJECT_REPLY, vec![]);
    let out = consolidator(renderer, client, ExtractionConfig::default())
        .consolidate(&paths(&["2024-01.pdf", "2024-02.pdf"]))
        .await;

    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("dataset.json");
    let err = write_consolidation(&out, dir.path(), &target).unwrap_err();
    assert!(matches!(err, ExtractError::MissingProjectIdentity { .. }));
    assert!(!target.exists());
}
