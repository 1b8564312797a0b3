//! Event-callback trait for rejections, job settlement and downloads.
//!
//! Inject an [`Arc<dyn JobEventCallback>`] via
//! [`crate::config::ClientConfigBuilder::event_callback`] to be told, as it
//! happens, when a file is rejected, a job starts or settles, and when an
//! artifact is saved or cannot be. This is where a front end raises its alerts; the CLI
//! drives its spinners from it.
//!
//! # Example
//!
//! ```rust
//! use lecturedesk::{ClientConfig, ConversionJob, JobEventCallback, JobFailure};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct FailureCounter {
//!     failed: AtomicUsize,
//! }
//!
//! impl JobEventCallback for FailureCounter {
//!     fn on_job_failed(&self, job: &ConversionJob, failure: &JobFailure) {
//!         self.failed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{} failed: {failure}", job.display_name);
//!     }
//! }
//!
//! let config = ClientConfig::builder()
//!     .event_callback(Arc::new(FailureCounter { failed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::error::{ConvertError, JobFailure};
use crate::ledger::ConversionJob;
use crate::workflow::Workflow;
use std::path::Path;
use std::sync::Arc;

/// Notified by a [`crate::session::ConversionSession`] as its state changes.
///
/// All methods run synchronously on the caller's task, in the order the
/// events happen. All have no-op defaults.
pub trait JobEventCallback: Send + Sync {
    /// A candidate file was refused by intake, or a submit found nothing usable.
    fn on_rejected(&self, workflow: Workflow, name: Option<&str>, reason: &str) {
        let _ = (workflow, name, reason);
    }

    /// A job was appended in `Processing` state; its request is about to go out.
    fn on_job_started(&self, job: &ConversionJob) {
        let _ = job;
    }

    /// A job settled `Completed`.
    fn on_job_completed(&self, job: &ConversionJob) {
        let _ = job;
    }

    /// A job settled `Failed`.
    fn on_job_failed(&self, job: &ConversionJob, failure: &JobFailure) {
        let _ = (job, failure);
    }

    /// A job's artifact was written to `path` and its handle released.
    fn on_download(&self, job: &ConversionJob, path: &Path) {
        let _ = (job, path);
    }

    /// Saving a job's artifact failed. The artifact is kept for another try.
    fn on_download_failed(&self, job: &ConversionJob, error: &ConvertError) {
        let _ = (job, error);
    }
}

/// A no-op implementation for callers that don't need events.
pub struct NoopEventCallback;

impl JobEventCallback for NoopEventCallback {}

/// Convenience alias matching the type stored in [`crate::config::ClientConfig`].
pub type EventCallback = Arc<dyn JobEventCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::JobLedger;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        rejected: AtomicUsize,
        started: AtomicUsize,
        failed: AtomicUsize,
    }

    impl JobEventCallback for TrackingCallback {
        fn on_rejected(&self, _workflow: Workflow, _name: Option<&str>, _reason: &str) {
            self.rejected.fetch_add(1, Ordering::SeqCst);
        }

        fn on_job_started(&self, _job: &ConversionJob) {
            self.started.fetch_add(1, Ordering::SeqCst);
        }

        fn on_job_failed(&self, _job: &ConversionJob, _failure: &JobFailure) {
            self.failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn sample_job() -> ConversionJob {
        let mut ledger = JobLedger::new();
        ConversionJob::processing(ledger.next_id(), Workflow::Document, "deck.pptx", 2048)
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopEventCallback;
        let job = sample_job();
        cb.on_rejected(Workflow::Braille, Some("a.png"), "nope");
        cb.on_job_started(&job);
        cb.on_job_completed(&job);
        cb.on_job_failed(
            &job,
            &JobFailure::DecodeFailed {
                detail: "x".into(),
            },
        );
        cb.on_download(&job, Path::new("/tmp/deck.docx"));
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        let job = sample_job();

        tracker.on_rejected(Workflow::Document, None, "No file selected");
        tracker.on_job_started(&job);
        tracker.on_job_failed(
            &job,
            &JobFailure::RequestFailed {
                status: Some(500),
                detail: "HTTP 500".into(),
            },
        );
        // defaults are no-ops
        tracker.on_job_completed(&job);

        assert_eq!(tracker.rejected.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.started.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.failed.load(Ordering::SeqCst), 1);
    }
}
