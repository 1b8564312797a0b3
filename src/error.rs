//! Error types for the lecturedesk library.
//!
//! Two distinct error types reflect two distinct failure scopes:
//!
//! * [`ConvertError`]: the call itself cannot proceed because nothing is selected,
//!   the file has the wrong type, the path cannot be read, the configuration
//!   is invalid or an artifact cannot be written. No ledger entry is created
//!   (or touched) when one of these is returned.
//!
//! * [`JobFailure`]: one submitted job failed (transport error, non-success
//!   status, unusable body). It travels inside
//!   [`crate::client::Settlement::Failed`], moves that job to
//!   [`crate::ledger::JobStatus::Failed`] and is reported to the event
//!   callback. The rest of the ledger is unaffected.

use std::path::PathBuf;
use thiserror::Error;

/// Errors returned directly by lecturedesk operations.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Intake errors ─────────────────────────────────────────────────────
    /// The candidate file is not accepted by the workflow.
    #[error("Unsupported file type for '{name}': {reason}")]
    UnsupportedFileType { name: String, reason: String },

    /// A conversion was requested with nothing selected.
    #[error("No file selected. Select a file before starting the conversion.")]
    NoFileSelected,

    /// The candidate is larger than the configured upload limit.
    #[error("File '{name}' is {size} bytes, larger than the {limit}-byte upload limit")]
    FileTooLarge { name: String, size: u64, limit: u64 },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write a downloaded artifact.
    #[error("Failed to write artifact '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Why a single submitted job ended up `Failed`.
///
/// Both variants are reported identically to the user: the job is marked
/// failed and the notification carries the message. The distinction exists
/// for logs and tests.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize, serde::Deserialize)]
pub enum JobFailure {
    /// The request never completed or the backend returned a non-success status.
    #[error("Conversion request failed: {detail}")]
    RequestFailed {
        status: Option<u16>,
        detail: String,
    },

    /// The response arrived but could not be turned into a usable artifact.
    #[error("Could not decode conversion result: {detail}")]
    DecodeFailed { detail: String },
}

impl JobFailure {
    /// HTTP status reported by the backend, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            JobFailure::RequestFailed { status, .. } => *status,
            JobFailure::DecodeFailed { .. } => None,
        }
    }
}
