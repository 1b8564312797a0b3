//! CLI binary for lecturedesk.
//!
//! A thin shim over the library crate: each file argument is selected and
//! submitted as its own job, all jobs run concurrently, and the job list is
//! printed newest first once everything has settled.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use futures::stream::{FuturesUnordered, StreamExt};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use lecturedesk::{
    ClientConfig, ConversionJob, ConversionSession, ConvertError, DownloadOutcome, EventCallback,
    JobEventCallback, JobFailure, JobId, JobStatus, Route, SimulatedBackend, Workflow,
};
use serde::Serialize;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
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

// ── CLI event callback using indicatif ───────────────────────────────────────

/// Terminal event sink: one spinner per in-flight job, plus a log line for
/// every rejection, settlement and save attempt. Jobs settle in whatever order
/// the backend answers, so spinners are tracked by job id.
struct CliEventCallback {
    bars: MultiProgress,
    spinners: Mutex<HashMap<JobId, ProgressBar>>,
    show_spinners: bool,
}

impl CliEventCallback {
    fn new(show_spinners: bool) -> Arc<Self> {
        Arc::new(Self {
            bars: MultiProgress::new(),
            spinners: Mutex::new(HashMap::new()),
            show_spinners,
        })
    }

    fn line(&self, msg: String) {
        if self.show_spinners {
            self.bars.println(msg).ok();
        } else {
            eprintln!("{msg}");
        }
    }

    fn finish(&self, id: JobId) {
        if let Some(bar) = self
            .spinners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id)
        {
            bar.finish_and_clear();
        }
    }
}

impl JobEventCallback for CliEventCallback {
    fn on_rejected(&self, _workflow: Workflow, name: Option<&str>, reason: &str) {
        self.line(format!(
            "  {} {}  {}",
            red("✗"),
            name.unwrap_or("(no file)"),
            red(reason)
        ));
    }

    fn on_job_started(&self, job: &ConversionJob) {
        if !self.show_spinners {
            return;
        }
        let bar = self.bars.add(ProgressBar::new_spinner());
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix(job.id.to_string());
        bar.set_message(format!("{} → {}", job.source_name, job.display_name));
        bar.enable_steady_tick(Duration::from_millis(80));
        self.spinners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(job.id, bar);
    }

    fn on_job_completed(&self, job: &ConversionJob) {
        self.finish(job.id);
        let size = job
            .artifact()
            .map(|a| format!("{:.1} KB", a.len() as f64 / 1024.0))
            .unwrap_or_default();
        self.line(format!(
            "  {} {:<5} {:<32}  {}",
            green("✓"),
            job.id,
            job.display_name,
            dim(&size)
        ));
    }

    fn on_job_failed(&self, job: &ConversionJob, failure: &JobFailure) {
        self.finish(job.id);
        self.line(format!(
            "  {} {:<5} {:<32}  {}",
            red("✗"),
            job.id,
            job.display_name,
            red(&failure.to_string())
        ));
    }

    fn on_download(&self, job: &ConversionJob, path: &Path) {
        self.line(format!(
            "  {} {:<5} saved {}",
            cyan("↓"),
            job.id,
            bold(&path.display().to_string())
        ));
    }

    fn on_download_failed(&self, job: &ConversionJob, error: &ConvertError) {
        self.line(format!(
            "  {} {:<5} {:<32}  {}",
            red("✗"),
            job.id,
            job.display_name,
            red(&format!("not saved: {error}"))
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Slides to DOCX (visual material described as text)
  lecturedesk convert week1.pptx

  # Several files at once, results into ./out
  lecturedesk convert week1.pptx week2.pdf -o out

  # DOCX to braille
  lecturedesk braille notes.docx

  # Talk to a remote backend
  lecturedesk --base-url http://converter.lan:8000 braille notes.docx

  # Try the workflow without a backend
  lecturedesk --simulate convert week1.pptx

  # Machine-readable job list
  lecturedesk --json convert week1.pptx > jobs.json

  # List the front-end pages
  lecturedesk pages

ACCEPTED INPUTS:
  convert   PDF, PPT, PPTX (checked by MIME type)   → POST /process → .docx
  braille   DOCX (checked by file extension)         → POST /braille → .brf

ENVIRONMENT VARIABLES:
  LECTUREDESK_BASE_URL     Conversion backend address (default http://localhost:8000)
  LECTUREDESK_OUTPUT_DIR   Where converted files are saved (default .)
  LECTUREDESK_TIMEOUT      Per-request timeout in seconds (default: none)
  RUST_LOG                 Override log filter (e.g. lecturedesk=debug)
"#;

/// Send lecture material to the conversion backend and save the results.
#[derive(Parser, Debug)]
#[command(
    name = "lecturedesk",
    version,
    about = "Send lecture material to the conversion backend and save the results",
    long_about = "Upload PDF / PowerPoint files for conversion to DOCX, or DOCX files for \
conversion to braille. Every file becomes a job; jobs run concurrently and each converted \
file is saved once.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// PDF / PPT / PPTX → DOCX.
    Convert {
        /// Files to convert.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// DOCX → braille.
    Braille {
        /// Files to convert.
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List the front-end pages.
    Pages,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Conversion backend base URL.
    #[arg(long, global = true, env = "LECTUREDESK_BASE_URL", default_value = lecturedesk::DEFAULT_BASE_URL)]
    base_url: String,

    /// Directory converted files are saved into.
    #[arg(short, long, global = true, env = "LECTUREDESK_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Per-request timeout in seconds (default: wait for the backend).
    #[arg(long, global = true, env = "LECTUREDESK_TIMEOUT")]
    timeout: Option<u64>,

    /// Largest file to upload, in MiB.
    #[arg(long, global = true, env = "LECTUREDESK_MAX_UPLOAD_MB", default_value_t = 100)]
    max_upload_mb: u64,

    /// Do not save converted files; only report job status.
    #[arg(long, global = true)]
    no_download: bool,

    /// Use a simulated backend (fixed delay, placeholder output).
    #[arg(long, global = true)]
    simulate: bool,

    /// Print the job list as JSON.
    #[arg(long, global = true, env = "LECTUREDESK_JSON")]
    json: bool,

    /// Disable spinners.
    #[arg(long, global = true, env = "LECTUREDESK_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "LECTUREDESK_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the final job list.
    #[arg(short, long, global = true, env = "LECTUREDESK_QUIET")]
    quiet: bool,
}

#[derive(Serialize)]
struct JobReport<'a> {
    #[serde(flatten)]
    job: &'a ConversionJob,
    saved_to: Option<&'a Path>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let common = &cli.common;

    // ── Logging setup ────────────────────────────────────────────────────
    // Spinners carry the feedback; keep library logs quiet while they run.
    let show_progress = !common.quiet && !common.no_progress && !common.json;
    let filter = if common.verbose {
        "debug"
    } else if common.quiet || show_progress {
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
        Command::Pages => {
            print_pages(common.json)?;
            Ok(())
        }
        Command::Convert { files } => run(Workflow::Document, files, common, show_progress).await,
        Command::Braille { files } => run(Workflow::Braille, files, common, show_progress).await,
    }
}

/// Select, submit, settle and download every file for one workflow.
async fn run(
    workflow: Workflow,
    files: &[PathBuf],
    common: &CommonArgs,
    show_progress: bool,
) -> Result<()> {
    let events = CliEventCallback::new(show_progress);
    let config = build_config(common, Arc::clone(&events) as EventCallback)?;

    let mut session = if common.simulate {
        ConversionSession::with_backend(workflow, config, Arc::new(SimulatedBackend::default()))
    } else {
        ConversionSession::new(workflow, config).context("Failed to set up the HTTP client")?
    };

    if !common.quiet && !common.json {
        eprintln!(
            "{} {}",
            cyan("◆"),
            bold(&format!(
                "{} conversion of {} file(s) via {}",
                workflow,
                files.len(),
                if common.simulate {
                    "simulated backend"
                } else {
                    common.base_url.as_str()
                }
            ))
        );
    }

    // ── Submit ───────────────────────────────────────────────────────────
    let mut rejected = 0usize;
    let mut tasks = FuturesUnordered::new();
    for path in files {
        if session.select_path(path).await.is_err() {
            rejected += 1;
            continue;
        }
        match session.submit() {
            Ok(task) => tasks.push(task),
            Err(_) => rejected += 1,
        }
    }

    // ── Settle in completion order ───────────────────────────────────────
    while let Some(outcome) = tasks.next().await {
        session.settle(outcome);
    }

    // ── Download ─────────────────────────────────────────────────────────
    let mut saved: HashMap<JobId, PathBuf> = HashMap::new();
    let mut unsaved = 0usize;
    if !common.no_download {
        let completed: Vec<JobId> = session
            .ledger()
            .iter()
            .filter(|j| j.is_downloadable())
            .map(|j| j.id)
            .collect();
        // A failed save is reported by `on_download_failed` and counted;
        // the remaining jobs are still downloaded.
        for id in completed {
            match session.download(id, &common.output_dir).await {
                Ok(DownloadOutcome::Saved(path)) => {
                    saved.insert(id, path);
                }
                Ok(DownloadOutcome::Unavailable) => {}
                Err(_) => unsaved += 1,
            }
        }
    }

    // ── Report ───────────────────────────────────────────────────────────
    if common.json {
        let report: Vec<JobReport<'_>> = session
            .ledger()
            .iter()
            .map(|job| JobReport {
                job,
                saved_to: saved.get(&job.id).map(PathBuf::as_path),
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise job list")?
        );
    } else {
        print_job_list(&session, &saved);
    }

    let failed = session.ledger().count(JobStatus::Failed);
    let completed = session.ledger().count(JobStatus::Completed);
    if !common.quiet && !common.json {
        eprintln!(
            "{}  {}/{} converted  ({} failed, {} rejected, {} not saved)",
            if failed == 0 && rejected == 0 && unsaved == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            completed,
            files.len(),
            failed,
            rejected,
            unsaved
        );
    }

    if failed > 0 || rejected > 0 {
        anyhow::bail!(
            "{} of {} file(s) were not converted",
            failed + rejected,
            files.len()
        );
    }
    if unsaved > 0 {
        anyhow::bail!(
            "{} converted file(s) could not be saved to {}",
            unsaved,
            common.output_dir.display()
        );
    }
    Ok(())
}

/// Map CLI args to `ClientConfig`.
fn build_config(common: &CommonArgs, events: EventCallback) -> Result<ClientConfig> {
    let mut builder = ClientConfig::builder()
        .base_url(common.base_url.clone())
        .max_upload_bytes(common.max_upload_mb.saturating_mul(1024 * 1024))
        .event_callback(events);
    if let Some(secs) = common.timeout {
        builder = builder.request_timeout_secs(secs);
    }
    builder.build().context("Invalid configuration")
}

/// The job list, newest first, the way the conversion page shows it.
fn print_job_list(session: &ConversionSession, saved: &HashMap<JobId, PathBuf>) {
    println!("{}", bold("Conversion results"));
    if session.ledger().is_empty() {
        println!("  {}", dim("No files have been converted yet."));
        return;
    }
    for job in session.ledger().iter() {
        let status = match job.status {
            JobStatus::Processing => cyan("processing"),
            JobStatus::Completed => green("completed"),
            JobStatus::Failed => red("failed"),
        };
        let mut times = format!("started {}", job.started_at.format("%H:%M:%S"));
        if let Some(done) = job.completed_at {
            times.push_str(&format!(" · done {}", done.format("%H:%M:%S")));
        }
        println!(
            "  {:<5} {:<32} {:<20} {:>9}  {}",
            job.id,
            job.display_name,
            status,
            format!("{:.1} KB", job.size_kb()),
            dim(&times)
        );
        if let Some(path) = saved.get(&job.id) {
            println!("        → {}", path.display());
        }
    }
}

fn print_pages(json: bool) -> Result<()> {
    if json {
        #[derive(Serialize)]
        struct Page {
            route: Route,
            path: &'static str,
            title: &'static str,
            description: &'static str,
            workflow: Option<Workflow>,
            placeholder: bool,
        }
        let pages: Vec<Page> = Route::ALL
            .into_iter()
            .map(|r| Page {
                route: r,
                path: r.path(),
                title: r.title(),
                description: r.description(),
                workflow: r.workflow(),
                placeholder: r.is_placeholder(),
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&pages).context("Failed to serialise pages")?
        );
        return Ok(());
    }

    for r in Route::ALL {
        let note = match (r.workflow(), r.is_placeholder()) {
            (Some(w), _) => format!("[{w}]"),
            (None, true) => "[placeholder]".to_string(),
            (None, false) => String::new(),
        };
        println!(
            "{:<10} {:<20} {:<14} {}",
            r.path(),
            bold(r.title()),
            dim(&note),
            r.description()
        );
    }
    Ok(())
}
