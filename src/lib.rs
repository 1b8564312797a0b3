//! # lecturedesk
//!
//! Client side of an accessible lecture-material service: pick a file, send
//! it to the conversion backend, track the job, save the result.
//!
//! The backend does the actual work. Two workflows are supported:
//!
//! * **Document**: PDF / PPT / PPTX in, DOCX out (`POST /process`).
//! * **Braille**: DOCX in, braille ready file out (`POST /braille`).
//!
//! ## Flow
//!
//! ```text
//! file
//!  │
//!  ├─ 1. Intake    validate against the workflow, hold one pending file
//!  ├─ 2. Submit    append a Processing job, start one request
//!  ├─ 3. Settle    Completed{artifact} | Failed{reason}, exactly once
//!  └─ 4. Download  save the artifact once, then release it
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lecturedesk::{ClientConfig, ConversionSession, DownloadOutcome, Workflow};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder()
//!         .base_url("http://localhost:8000")
//!         .build()?;
//!     let mut session = ConversionSession::new(Workflow::Braille, config)?;
//!
//!     session.select_path("notes.docx").await?;
//!     let id = session.convert().await?;
//!
//!     if let DownloadOutcome::Saved(path) = session.download(id, "out").await? {
//!         println!("saved {}", path.display());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `lecturedesk` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod artifact;
pub mod backend;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod intake;
pub mod ledger;
pub mod navigation;
pub mod session;
pub mod workflow;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use artifact::{ArtifactHandle, DownloadOutcome};
pub use backend::{ConversionBackend, HttpBackend, RawResponse, SimulatedBackend, Upload};
pub use client::{ConversionClient, ConversionTask, Settlement, TaskOutcome};
pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_BASE_URL};
pub use error::{ConvertError, JobFailure};
pub use events::{EventCallback, JobEventCallback, NoopEventCallback};
pub use intake::{CandidateFile, PendingFile, UploadIntake};
pub use ledger::{ConversionJob, JobId, JobLedger, JobPatch, JobStatus};
pub use navigation::Route;
pub use session::ConversionSession;
pub use workflow::Workflow;
