//! CLI binary for ivv-extract.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ExtractionConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use ivv_extract::fetch::DEFAULT_PREFIX_LEN;
use ivv_extract::{
    backfill_titles_in_file, default_processor, discover_documents, download_all,
    extract_document, links_from_file, group_by_prefix, write_consolidation, write_json_atomic,
    BatchConsolidator, BatchProgressCallback, BatchReport, ExtractionConfig, FetchOptions,
    ProgressCallback,
};
use reqwest::Url;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a live bar plus one log line per report.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Per-document wall-clock start times, keyed by 1-based index.
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Start as a spinner; the first `on_document_start` switches to a sized bar.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Scanning reports…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} reports  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Extracting");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, index: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&index))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_documents: usize) {
        self.bar.set_message(format!("seeding project from the latest of {total_documents} reports"));
    }

    fn on_project_seeded(&self, document: &str, project_name: Option<&str>) {
        match project_name {
            Some(name) => self.bar.println(format!(
                "{} {}  {}",
                cyan("◆"),
                bold(name),
                dim(&format!("(from {document})"))
            )),
            None => self.bar.println(format!(
                "{} {}",
                red("✗"),
                red(&format!("No project information in {document}"))
            )),
        }
    }

    fn on_document_start(&self, index: usize, total: usize, name: &str) {
        if self.bar.length().unwrap_or(0) != total as u64 {
            self.activate_bar(total);
        }
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(index, Instant::now());
        }
        self.bar.set_message(name.to_string());
    }

    fn on_document_complete(&self, index: usize, total: usize, name: &str, issues: usize, events: usize) {
        let secs = self.elapsed_secs(index);
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}  {}",
            green("✓"),
            index,
            total,
            name,
            dim(&format!("{issues} issues, {events} events")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_document_error(&self, index: usize, total: usize, name: &str) {
        let secs = self.elapsed_secs(index);
        self.errors.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            red("✗"),
            index,
            total,
            red(name),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, attempted: usize, succeeded: usize) {
        let failed = self.errors.load(Ordering::SeqCst);
        self.bar.finish_and_clear();

        if attempted == 0 {
            return;
        }
        if failed == 0 {
            eprintln!(
                "{} {} reports extracted successfully",
                green("✔"),
                bold(&succeeded.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} reports extracted  ({} failed)",
                if succeeded == 0 { red("✘") } else { cyan("⚠") },
                bold(&succeeded.to_string()),
                attempted,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Scrape the saved listing page and download every report
  ivv-extract fetch target.html --base https://ets.hawaii.gov/ -d downloads

  # One directory per project, keyed by the first 8 characters of the file name
  ivv-extract group downloads

  # Consolidate one project's reports into a dataset
  ivv-extract consolidate "downloads/KOLEA 20" -o parsed_jsons/kolea.json

  # Extract a single report (project + report + issues + events)
  ivv-extract parse "downloads/KOLEA 20/KOLEA 2024-04 Report.pdf"

  # Add titles to issues that have none, rewriting the dataset in place
  ivv-extract titles parsed_jsons/kolea.json

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  OPENAI_MODEL            Model ID (default: gpt-4o)
  IVV_LLM_PROVIDER        Override provider (openai, anthropic, gemini, ollama)
  PDFIUM_LIB_PATH         Path to libpdfium; the system library is used otherwise
  RUST_LOG                Log filter, overrides --verbose/--quiet
"#;

/// Extract structured IV&V report data from PDFs using Vision LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "ivv-extract",
    version,
    about = "Extract structured IV&V report data from PDFs using Vision LLMs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    llm: ModelArgs,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "IVV_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "IVV_QUIET")]
    quiet: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "IVV_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// LLM model ID (default: $OPENAI_MODEL, then gpt-4o).
    #[arg(long, global = true)]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, global = true, env = "IVV_LLM_PROVIDER")]
    provider: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, global = true, env = "IVV_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Max LLM output tokens for report extraction.
    #[arg(long, global = true, env = "IVV_MAX_TOKENS", default_value_t = 4000)]
    max_tokens: usize,

    /// Max LLM output tokens for project seeding.
    #[arg(long, global = true, env = "IVV_PROJECT_MAX_TOKENS", default_value_t = 2000)]
    project_max_tokens: usize,

    /// Pages rendered per report.
    #[arg(long, global = true, env = "IVV_PAGE_LIMIT", default_value_t = 10,
          value_parser = clap::value_parser!(u64).range(1..))]
    page_limit: u64,

    /// Render every page instead of the first --page-limit pages.
    #[arg(long, global = true)]
    all_pages: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Consolidate every PDF in a directory into one dataset.
    Consolidate {
        /// Directory of report PDFs (date-prefixed file names).
        dir: PathBuf,

        /// Output file (default: parsed_jsons/<dir>_complete_dataset.json).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Extract project, report, issues and events from one PDF.
    Parse {
        file: PathBuf,

        /// Write JSON to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate titles for untitled issues in a dataset.
    Titles {
        dataset: PathBuf,

        /// Output file (default: rewrite the input).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Download every PDF linked from a saved HTML listing page.
    Fetch {
        html: PathBuf,

        /// Base URL for resolving relative links.
        #[arg(long)]
        base: Option<String>,

        /// Download directory.
        #[arg(short = 'd', long, default_value = "downloads")]
        dir: PathBuf,

        /// Per-download timeout in seconds.
        #[arg(long, default_value_t = 30)]
        timeout: u64,

        /// Pause between downloads in milliseconds.
        #[arg(long, default_value_t = 1000)]
        delay_ms: u64,
    },

    /// Move PDFs into subdirectories named by their file-name prefix.
    Group {
        #[arg(default_value = "downloads")]
        dir: PathBuf,

        #[arg(long, default_value_t = DEFAULT_PREFIX_LEN)]
        prefix_len: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar gives all the feedback that matters, so library logs
    // drop to errors while it is visible.
    let show_progress = !cli.quiet
        && !cli.no_progress
        && matches!(cli.command, Command::Consolidate { .. });
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match &cli.command {
        Command::Consolidate { dir, output } => {
            let progress_cb: Option<ProgressCallback> = if show_progress {
                let cb = CliProgressCallback::new_dynamic();
                Some(cb as Arc<dyn BatchProgressCallback>)
            } else {
                None
            };
            let config = build_config(&cli.llm, progress_cb)?;
            let output_path = output.clone().unwrap_or_else(|| default_output(dir));
            run_consolidate(dir, &output_path, &config, cli.quiet).await
        }
        Command::Parse { file, output } => {
            let config = build_config(&cli.llm, None)?;
            let fragment = extract_document(file, &config)
                .await
                .context("Extraction failed")?;
            match output {
                Some(path) => {
                    write_json_atomic(path, &fragment).context("Failed to write output")?;
                    if !cli.quiet {
                        eprintln!(
                            "{}  {} issues, {} events  →  {}",
                            green("✔"),
                            fragment.issues.len(),
                            fragment.events.len(),
                            bold(&path.display().to_string())
                        );
                    }
                }
                None => {
                    let json = serde_json::to_string_pretty(&fragment)
                        .context("Failed to serialise output")?;
                    println!("{json}");
                }
            }
            Ok(())
        }
        Command::Titles { dataset, output } => {
            let config = build_config(&cli.llm, None)?;
            let target = output.clone().unwrap_or_else(|| dataset.clone());
            let written = backfill_titles_in_file(dataset, &target, &config)
                .await
                .context("Title backfill failed")?;
            if !cli.quiet {
                eprintln!(
                    "{}  {} titles written  →  {}",
                    green("✔"),
                    written,
                    bold(&target.display().to_string())
                );
            }
            Ok(())
        }
        Command::Fetch {
            html,
            base,
            dir,
            timeout,
            delay_ms,
        } => {
            let base = base
                .as_deref()
                .map(Url::parse)
                .transpose()
                .context("Invalid --base URL")?;
            let links = links_from_file(html, base.as_ref()).context("Failed to read listing page")?;
            let options = FetchOptions {
                timeout_secs: *timeout,
                delay_ms: *delay_ms,
            };
            let summary = download_all(&links, dir, &options)
                .await
                .context("Download failed")?;
            if !cli.quiet {
                eprintln!(
                    "{}  {} successful  {} failed  {} total",
                    if summary.failed == 0 { green("✔") } else { cyan("⚠") },
                    summary.successful(),
                    summary.failed,
                    summary.total
                );
            }
            Ok(())
        }
        Command::Group { dir, prefix_len } => {
            let groups = group_by_prefix(dir, *prefix_len).context("Grouping failed")?;
            if !cli.quiet {
                for g in &groups {
                    eprintln!(
                        "  {}  {} moved  {}",
                        bold(&g.prefix),
                        g.moved.len(),
                        dim(&format!("{} skipped", g.skipped.len()))
                    );
                }
                eprintln!("{}  {} groups", green("✔"), groups.len());
            }
            Ok(())
        }
    }
}

async fn run_consolidate(
    dir: &Path,
    output_path: &Path,
    config: &ExtractionConfig,
    quiet: bool,
) -> Result<()> {
    let documents = discover_documents(dir).context("Failed to scan report directory")?;
    if documents.is_empty() {
        anyhow::bail!("No PDF files found in {}", dir.display());
    }

    let processor = default_processor(config).context("Consolidation failed")?;
    let output = BatchConsolidator::new(processor).consolidate(&documents).await;

    if !quiet {
        print_batch_report(&output.report);
    }

    write_consolidation(&output, dir, output_path).context("Consolidation failed")?;

    if !quiet {
        eprintln!(
            "   {} issues  /  {} events  →  {}",
            dim(&output.dataset.issues.len().to_string()),
            dim(&output.dataset.events.len().to_string()),
            bold(&output_path.display().to_string()),
        );
    }
    Ok(())
}

fn print_batch_report(report: &BatchReport) {
    let ok = report.failed == 0 && !report.project_missing;
    eprintln!(
        "{}  {}/{} reports  {} failed  {} found  {}ms",
        if ok { green("✔") } else { cyan("⚠") },
        report.succeeded,
        report.attempted,
        report.failed,
        report.discovered,
        report.duration_ms,
    );
    if let Some(seed) = &report.seed_failed {
        eprintln!("   {} no project information in {}", red("✗"), seed.display());
    }
    for failed in &report.failed_documents {
        eprintln!("   {} {}", red("✗"), failed.display());
    }
}

/// `parsed_jsons/<dir name>_complete_dataset.json`
fn default_output(dir: &Path) -> PathBuf {
    let stem = dir
        .file_name()
        .map(|n| n.to_string_lossy().trim().replace(' ', "_").to_lowercase())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "project".to_string());
    PathBuf::from("parsed_jsons").join(format!("{stem}_complete_dataset.json"))
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(args: &ModelArgs, progress: Option<ProgressCallback>) -> Result<ExtractionConfig> {
    let page_limit = if args.all_pages {
        None
    } else {
        Some(args.page_limit as usize)
    };

    let mut builder = ExtractionConfig::builder()
        .temperature(args.temperature)
        .max_tokens(args.max_tokens)
        .project_max_tokens(args.project_max_tokens)
        .page_limit(page_limit);

    if let Some(ref model) = args.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
