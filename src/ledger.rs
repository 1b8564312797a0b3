//! The job ledger: every conversion submitted during a session, newest first.
//!
//! A [`ConversionJob`] is created in [`JobStatus::Processing`] the moment a
//! file is submitted and settles exactly once, into either
//! [`JobStatus::Completed`] (with an artifact attached) or
//! [`JobStatus::Failed`]. [`JobLedger::update`] refuses any patch that would
//! move a job out of a terminal state, so a late or duplicated settlement
//! cannot overwrite an earlier one.
//!
//! Identifiers come from a per-ledger counter ([`JobLedger::next_id`]) rather
//! than the clock, so two submissions in the same millisecond still get
//! distinct ids.

use crate::artifact::ArtifactHandle;
use crate::workflow::Workflow;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, warn};

/// Identifier of a job within one ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct JobId(u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Processing)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One submitted conversion.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionJob {
    pub id: JobId,
    pub workflow: Workflow,
    /// Name of the file as it was uploaded.
    pub source_name: String,
    /// Name shown in the job list: the source name with the target extension.
    pub display_name: String,
    pub size_bytes: u64,
    pub status: JobStatus,
    pub started_at: DateTime<Local>,
    pub completed_at: Option<DateTime<Local>>,
    /// Set when the artifact was saved and its handle released.
    pub downloaded_at: Option<DateTime<Local>>,
    #[serde(skip)]
    artifact: Option<ArtifactHandle>,
}

impl ConversionJob {
    /// A fresh job in `Processing` state, started now.
    pub fn processing(id: JobId, workflow: Workflow, source_name: &str, size_bytes: u64) -> Self {
        Self {
            id,
            workflow,
            source_name: source_name.to_string(),
            display_name: workflow.derive_filename(source_name),
            size_bytes,
            status: JobStatus::Processing,
            started_at: Local::now(),
            completed_at: None,
            downloaded_at: None,
            artifact: None,
        }
    }

    /// Size in KiB, for the status list.
    pub fn size_kb(&self) -> f64 {
        self.size_bytes as f64 / 1024.0
    }

    /// The artifact, while it has not been released.
    pub fn artifact(&self) -> Option<&ArtifactHandle> {
        self.artifact.as_ref()
    }

    /// `true` when a download would produce a file.
    pub fn is_downloadable(&self) -> bool {
        self.status == JobStatus::Completed && self.artifact.is_some()
    }
}

/// A change applied to a job through [`JobLedger::update`].
#[derive(Debug)]
pub enum JobPatch {
    /// `Processing → Completed`, attaching the artifact.
    Complete { artifact: ArtifactHandle },
    /// `Processing → Failed`.
    Fail,
    /// Drop the artifact of a completed job after it was saved.
    ReleaseArtifact,
}

/// Newest-first list of all jobs in a session.
#[derive(Debug, Default)]
pub struct JobLedger {
    jobs: VecDeque<ConversionJob>,
    last_id: u64,
}

impl JobLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a fresh identifier. Never returns the same id twice.
    pub fn next_id(&mut self) -> JobId {
        self.last_id += 1;
        JobId(self.last_id)
    }

    /// Insert `job` at the front.
    ///
    /// Returns `false` and leaves the ledger unchanged when a job with the
    /// same id is already present.
    pub fn append(&mut self, job: ConversionJob) -> bool {
        if self.get(job.id).is_some() {
            warn!("Refusing to append duplicate job {}", job.id);
            return false;
        }
        debug!("Appending job {} ({})", job.id, job.display_name);
        self.jobs.push_front(job);
        true
    }

    /// Apply `patch` to the job with `id`.
    ///
    /// Returns the updated job, or `None` when the id is unknown or the patch
    /// is not valid for the job's current state. Both cases leave the ledger
    /// untouched.
    pub fn update(&mut self, id: JobId, patch: JobPatch) -> Option<&ConversionJob> {
        let Some(job) = self.jobs.iter_mut().find(|j| j.id == id) else {
            warn!("Update for unknown job {} ignored", id);
            return None;
        };

        match patch {
            JobPatch::Complete { artifact } => {
                if job.status.is_terminal() {
                    warn!("Job {} already {}; completion ignored", id, job.status);
                    return None;
                }
                job.status = JobStatus::Completed;
                job.completed_at = Some(Local::now());
                job.artifact = Some(artifact);
            }
            JobPatch::Fail => {
                if job.status.is_terminal() {
                    warn!("Job {} already {}; failure ignored", id, job.status);
                    return None;
                }
                job.status = JobStatus::Failed;
                job.completed_at = Some(Local::now());
            }
            JobPatch::ReleaseArtifact => {
                if job.artifact.take().is_none() {
                    return None;
                }
                job.downloaded_at = Some(Local::now());
            }
        }

        Some(job)
    }

    pub fn get(&self, id: JobId) -> Option<&ConversionJob> {
        self.jobs.iter().find(|j| j.id == id)
    }

    /// Jobs, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &ConversionJob> {
        self.jobs.iter()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Number of jobs currently in `status`.
    pub fn count(&self, status: JobStatus) -> usize {
        self.jobs.iter().filter(|j| j.status == status).count()
    }
}
