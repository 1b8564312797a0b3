//! The session store: one workflow page's state, explicitly owned.
//!
//! A [`ConversionSession`] bundles what a conversion page holds: the
//! [`UploadIntake`] with its pending file, the [`JobLedger`], and the
//! [`ConversionClient`] that talks to the backend. All mutation goes through
//! `&mut self`, one event at a time; network I/O happens inside detached
//! [`ConversionTask`]s, so a slow request never blocks further submissions.
//!
//! ## Lifecycle of one file
//!
//! ```text
//! select ─▶ submit ─────────────▶ task.await ─▶ settle ─▶ download
//!           │ job appended as                   │ Completed / Failed
//!           │ Processing, pending taken         │ (exactly once)
//! ```
//!
//! [`ConversionSession::convert`] runs `submit → await → settle` in one call
//! for callers that don't need to interleave other work.

use crate::artifact::{self, DownloadOutcome};
use crate::backend::{ConversionBackend, HttpBackend, Upload};
use crate::client::{ConversionClient, ConversionTask, Settlement, TaskOutcome};
use crate::config::ClientConfig;
use crate::error::ConvertError;
use crate::intake::{CandidateFile, PendingFile, UploadIntake};
use crate::ledger::{ConversionJob, JobId, JobLedger, JobPatch, JobStatus};
use crate::workflow::Workflow;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// State of one conversion page.
pub struct ConversionSession {
    workflow: Workflow,
    config: ClientConfig,
    intake: UploadIntake,
    ledger: JobLedger,
    client: ConversionClient,
}

impl ConversionSession {
    /// A session that talks to the HTTP backend at `config.base_url`.
    pub fn new(workflow: Workflow, config: ClientConfig) -> Result<Self, ConvertError> {
        let backend = HttpBackend::new(&config)?;
        Ok(Self::with_backend(workflow, config, Arc::new(backend)))
    }

    /// A session using a caller-supplied backend.
    pub fn with_backend(
        workflow: Workflow,
        config: ClientConfig,
        backend: Arc<dyn ConversionBackend>,
    ) -> Self {
        Self {
            workflow,
            intake: UploadIntake::new(workflow, config.max_upload_bytes),
            ledger: JobLedger::new(),
            client: ConversionClient::new(backend),
            config,
        }
    }

    pub fn workflow(&self) -> Workflow {
        self.workflow
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn ledger(&self) -> &JobLedger {
        &self.ledger
    }

    pub fn job(&self, id: JobId) -> Option<&ConversionJob> {
        self.ledger.get(id)
    }

    pub fn pending(&self) -> Option<&PendingFile> {
        self.intake.pending()
    }

    /// Jobs whose request has not resolved yet.
    pub fn in_flight(&self) -> usize {
        self.ledger.count(JobStatus::Processing)
    }

    /// Offer a candidate file to intake.
    ///
    /// Rejections are reported to the event callback before returning.
    pub fn select(&mut self, candidate: CandidateFile) -> Result<&PendingFile, ConvertError> {
        let name = candidate.name.clone();
        match self.intake.select(candidate) {
            Ok(pending) => Ok(pending),
            Err(e) => {
                warn!("Rejected {}: {}", name, e);
                if let Some(cb) = &self.config.event_callback {
                    cb.on_rejected(self.workflow, Some(&name), &e.to_string());
                }
                Err(e)
            }
        }
    }

    /// Drop the pending file without submitting it.
    pub fn clear_selection(&mut self) {
        self.intake.clear();
    }

    /// Read `path` from disk and offer it to intake.
    pub async fn select_path(&mut self, path: impl AsRef<Path>) -> Result<&PendingFile, ConvertError> {
        let path = path.as_ref();
        match CandidateFile::from_path(path, self.config.max_upload_bytes).await {
            Ok(candidate) => self.select(candidate),
            Err(e) => {
                warn!("Could not read {}: {}", path.display(), e);
                if let Some(cb) = &self.config.event_callback {
                    let name = path.file_name().map(|n| n.to_string_lossy());
                    cb.on_rejected(self.workflow, name.as_deref(), &e.to_string());
                }
                Err(e)
            }
        }
    }

    /// Create a `Processing` job for the pending file and start its request.
    ///
    /// The job is in the ledger before this returns; the request runs when
    /// the returned task is polled. Fails without touching the ledger when
    /// nothing is selected or the selection does not fit the workflow.
    pub fn submit(&mut self) -> Result<ConversionTask, ConvertError> {
        let precheck = match self.intake.pending() {
            None => Err(ConvertError::NoFileSelected),
            Some(p) => self
                .workflow
                .check(p.name(), p.mime())
                .map_err(|reason| ConvertError::UnsupportedFileType {
                    name: p.name().to_string(),
                    reason,
                }),
        };
        if let Err(e) = precheck {
            warn!("Submit refused: {}", e);
            if let Some(cb) = &self.config.event_callback {
                let name = self.intake.pending().map(PendingFile::name);
                cb.on_rejected(self.workflow, name, &e.to_string());
            }
            return Err(e);
        }

        let pending = self.intake.take().ok_or(ConvertError::NoFileSelected)?;
        let id = self.ledger.next_id();
        let job = ConversionJob::processing(id, self.workflow, pending.name(), pending.size());
        info!(
            "Job {} started: {} → {}",
            id, job.source_name, job.display_name
        );
        if !self.ledger.append(job) {
            return Err(ConvertError::Internal(format!("job id {id} reused")));
        }
        if let (Some(cb), Some(job)) = (&self.config.event_callback, self.ledger.get(id)) {
            cb.on_job_started(job);
        }

        let upload = Upload {
            name: pending.name().to_string(),
            mime: pending.mime().to_string(),
            bytes: pending.bytes().clone(),
        };
        Ok(ConversionTask::new(
            id,
            self.client.dispatch(self.workflow, upload),
        ))
    }

    /// Apply a task's settlement to its job.
    ///
    /// Returns the settled job, or `None` when the job is unknown or was
    /// already settled (the settlement is then discarded).
    pub fn settle(&mut self, outcome: TaskOutcome) -> Option<&ConversionJob> {
        let TaskOutcome { id, settlement } = outcome;
        let (patch, failure) = match settlement {
            Settlement::Completed { artifact } => (JobPatch::Complete { artifact }, None),
            Settlement::Failed { reason } => (JobPatch::Fail, Some(reason)),
        };

        let job = self.ledger.update(id, patch)?;
        match &failure {
            None => info!("Job {} completed: {}", id, job.display_name),
            Some(reason) => warn!("Job {} failed: {}", id, reason),
        }
        if let Some(cb) = &self.config.event_callback {
            match &failure {
                None => cb.on_job_completed(job),
                Some(reason) => cb.on_job_failed(job, reason),
            }
        }
        Some(job)
    }

    /// Submit the pending file, wait for the backend, and settle the job.
    pub async fn convert(&mut self) -> Result<JobId, ConvertError> {
        let task = self.submit()?;
        let outcome = task.await;
        let id = outcome.id;
        self.settle(outcome);
        Ok(id)
    }

    /// Save a completed job's artifact into `dir`, then release it.
    ///
    /// Returns [`DownloadOutcome::Unavailable`] when the job is unknown,
    /// not completed, or already downloaded. Artifacts are single-use: only
    /// the first successful download writes a file. A failed save keeps the
    /// artifact so the download can be retried. Existing files are never
    /// replaced (see [`artifact::save`]).
    pub async fn download(
        &mut self,
        id: JobId,
        dir: impl AsRef<Path>,
    ) -> Result<DownloadOutcome, ConvertError> {
        let Some(artifact) = self
            .ledger
            .get(id)
            .filter(|job| job.status == JobStatus::Completed)
            .and_then(ConversionJob::artifact)
            .cloned()
        else {
            info!("Job {} has no artifact to download", id);
            return Ok(DownloadOutcome::Unavailable);
        };

        if artifact.is_empty() {
            warn!("Job {} produced an empty artifact", id);
        }

        // Keep the handle on the job until the bytes are safely on disk.
        let path = match artifact::save(&artifact, dir.as_ref()).await {
            Ok(path) => path,
            Err(e) => {
                warn!("Job {} could not be saved: {}", id, e);
                if let (Some(cb), Some(job)) =
                    (&self.config.event_callback, self.ledger.get(id))
                {
                    cb.on_download_failed(job, &e);
                }
                return Err(e);
            }
        };

        if let Some(job) = self.ledger.update(id, JobPatch::ReleaseArtifact) {
            if let Some(cb) = &self.config.event_callback {
                cb.on_download(job, &path);
            }
        }
        Ok(DownloadOutcome::Saved(path))
    }
}
