//! The conversion client: one request per job, one settlement per request.
//!
//! [`ConversionClient::dispatch`] starts the request for a submitted file and
//! hands back a [`ConversionTask`]. The task owns everything it needs, so the
//! session is free to accept more submissions while it is pending. When the
//! task resolves it yields a [`TaskOutcome`] carrying a single
//! [`Settlement`], which [`crate::session::ConversionSession::settle`] applies
//! to the ledger.
//!
//! ```text
//! submit ──▶ ConversionTask ──(await)──▶ TaskOutcome { id, Settlement } ──▶ settle
//!                                         ├─ Completed { artifact }
//!                                         └─ Failed { reason }
//! ```

use crate::artifact::{sanitize_filename, ArtifactHandle};
use crate::backend::{ConversionBackend, RawResponse, Upload};
use crate::error::JobFailure;
use crate::ledger::JobId;
use crate::workflow::Workflow;
use futures::future::BoxFuture;
use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::debug;

/// How a job's request ended.
#[derive(Debug, Clone)]
pub enum Settlement {
    Completed { artifact: ArtifactHandle },
    Failed { reason: JobFailure },
}

/// A settlement tagged with the job it belongs to.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub id: JobId,
    pub settlement: Settlement,
}

/// The in-flight request of one job.
///
/// Await it (or spawn it) and pass the output to
/// [`crate::session::ConversionSession::settle`].
#[must_use = "a conversion task does nothing unless awaited, and its outcome must be settled"]
pub struct ConversionTask {
    id: JobId,
    inner: BoxFuture<'static, Settlement>,
}

impl ConversionTask {
    pub(crate) fn new(id: JobId, inner: BoxFuture<'static, Settlement>) -> Self {
        Self { id, inner }
    }

    /// Job this task will settle.
    pub fn id(&self) -> JobId {
        self.id
    }
}

impl Future for ConversionTask {
    type Output = TaskOutcome;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let id = this.id;
        this.inner
            .as_mut()
            .poll(cx)
            .map(|settlement| TaskOutcome { id, settlement })
    }
}

/// Issues conversion requests through a [`ConversionBackend`].
#[derive(Clone)]
pub struct ConversionClient {
    backend: Arc<dyn ConversionBackend>,
}

impl ConversionClient {
    pub fn new(backend: Arc<dyn ConversionBackend>) -> Self {
        Self { backend }
    }

    /// Start the request for `upload` and return the settlement future.
    pub fn dispatch(&self, workflow: Workflow, upload: Upload) -> BoxFuture<'static, Settlement> {
        let backend = Arc::clone(&self.backend);
        Box::pin(async move {
            let source_name = upload.name.clone();
            let result = backend
                .convert(workflow, upload)
                .await
                .and_then(|raw| build_artifact(workflow, &source_name, raw));
            match result {
                Ok(artifact) => Settlement::Completed { artifact },
                Err(reason) => Settlement::Failed { reason },
            }
        })
    }
}

/// Turn a successful response into a named artifact.
///
/// Only the braille endpoint names its output through `Content-Disposition`;
/// the document endpoint's artifact is always named locally and always
/// labelled DOCX, whatever content type the server sent.
pub fn build_artifact(
    workflow: Workflow,
    source_name: &str,
    raw: RawResponse,
) -> Result<ArtifactHandle, JobFailure> {
    let local_name = workflow.derive_filename(source_name);

    let filename = match (workflow, raw.content_disposition.as_deref()) {
        (Workflow::Braille, Some(header)) => match disposition_filename(header)? {
            Some(name) => sanitize_filename(&name).unwrap_or(local_name),
            None => local_name,
        },
        _ => local_name,
    };

    let content_type = match workflow {
        Workflow::Document => workflow.artifact_content_type().to_string(),
        Workflow::Braille => raw
            .content_type
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or_else(|| workflow.artifact_content_type().to_string()),
    };

    debug!(
        "Artifact {} ({} bytes, {})",
        filename,
        raw.body.len(),
        content_type
    );
    Ok(ArtifactHandle::new(raw.body, filename, content_type))
}

static FILENAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)filename="?([^";]+)"?"#).expect("valid filename regex"));

/// Extract and percent-decode the filename from a `Content-Disposition` value.
///
/// `Ok(None)` when the header names no file. Malformed percent-encoding (or
/// an encoding that is not UTF-8) is a decode failure, not a fallback.
pub fn disposition_filename(header: &str) -> Result<Option<String>, JobFailure> {
    let Some(raw) = FILENAME_RE
        .captures(header)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
    else {
        return Ok(None);
    };

    if has_malformed_escape(raw) {
        return Err(JobFailure::DecodeFailed {
            detail: format!("malformed percent-encoding in filename '{raw}'"),
        });
    }

    percent_decode_str(raw)
        .decode_utf8()
        .map(|name| Some(name.into_owned()))
        .map_err(|e| JobFailure::DecodeFailed {
            detail: format!("filename '{raw}' is not valid UTF-8: {e}"),
        })
}

/// `%` not followed by two hex digits.
fn has_malformed_escape(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.iter().enumerate().any(|(i, &b)| {
        b == b'%'
            && !(bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
                && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SimulatedBackend;
    use crate::ledger::JobLedger;
    use crate::workflow::DOCX_MIME;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::time::Duration;

    fn raw(disposition: Option<&str>) -> RawResponse {
        RawResponse {
            body: Bytes::from_static(b"data"),
            content_type: None,
            content_disposition: disposition.map(str::to_string),
        }
    }

    #[test]
    fn disposition_plain_and_quoted() {
        assert_eq!(
            disposition_filename(r#"attachment; filename="notes.brf""#).unwrap(),
            Some("notes.brf".to_string())
        );
        assert_eq!(
            disposition_filename("attachment; filename=notes.brf; size=3").unwrap(),
            Some("notes.brf".to_string())
        );
        assert_eq!(
            disposition_filename(r#"ATTACHMENT; FILENAME="X.BRF""#).unwrap(),
            Some("X.BRF".to_string())
        );
    }

    #[test]
    fn disposition_percent_decodes() {
        assert_eq!(
            disposition_filename("attachment; filename=%EA%B0%95%EC%9D%98.brf").unwrap(),
            Some("강의.brf".to_string())
        );
        assert_eq!(
            disposition_filename(r#"attachment; filename="week%201.brf""#).unwrap(),
            Some("week 1.brf".to_string())
        );
    }

    #[test]
    fn disposition_without_filename() {
        assert_eq!(disposition_filename("inline").unwrap(), None);
    }

    #[test]
    fn disposition_malformed_escape_fails() {
        let err = disposition_filename("attachment; filename=bad%zz.brf").unwrap_err();
        assert!(matches!(err, JobFailure::DecodeFailed { .. }));
        assert!(disposition_filename("attachment; filename=trailing%").is_err());
        assert!(disposition_filename("attachment; filename=%ff.brf").is_err());
    }

    #[test]
    fn braille_artifact_prefers_server_name() {
        let a = build_artifact(
            Workflow::Braille,
            "notes.docx",
            raw(Some(r#"attachment; filename="server-notes.brf""#)),
        )
        .unwrap();
        assert_eq!(a.filename(), "server-notes.brf");
    }

    #[test]
    fn braille_artifact_falls_back_to_local_name() {
        let a = build_artifact(Workflow::Braille, "notes.docx", raw(None)).unwrap();
        assert_eq!(a.filename(), "notes.brf");
        assert_eq!(a.content_type(), "text/plain");
    }

    #[test]
    fn braille_artifact_strips_path_from_server_name() {
        let a = build_artifact(
            Workflow::Braille,
            "notes.docx",
            raw(Some(r#"attachment; filename="../../evil.brf""#)),
        )
        .unwrap();
        assert_eq!(a.filename(), "evil.brf");
    }

    #[test]
    fn braille_artifact_with_nul_in_server_name_uses_local_name() {
        let a = build_artifact(
            Workflow::Braille,
            "notes.docx",
            raw(Some("attachment; filename=a%00b.brf")),
        )
        .unwrap();
        assert_eq!(a.filename(), "notes.brf");
    }

    #[test]
    fn document_artifact_is_labelled_docx() {
        let mut response = raw(None);
        response.content_type = Some("application/octet-stream".into());
        let a = build_artifact(Workflow::Document, "week1.pdf", response).unwrap();
        assert_eq!(a.content_type(), DOCX_MIME);
    }

    #[test]
    fn document_artifact_ignores_disposition() {
        let a = build_artifact(
            Workflow::Document,
            "lecture.pptx",
            raw(Some(r#"attachment; filename="other.docx""#)),
        )
        .unwrap();
        assert_eq!(a.filename(), "lecture.docx");
        assert_eq!(a.content_type(), DOCX_MIME);
    }

    struct FailingBackend;

    #[async_trait]
    impl ConversionBackend for FailingBackend {
        async fn convert(&self, _: Workflow, _: Upload) -> Result<RawResponse, JobFailure> {
            Err(JobFailure::RequestFailed {
                status: Some(503),
                detail: "HTTP 503".into(),
            })
        }
    }

    fn upload(name: &str) -> Upload {
        Upload {
            name: name.into(),
            mime: "application/pdf".into(),
            bytes: Bytes::from_static(b"%PDF"),
        }
    }

    #[tokio::test]
    async fn dispatch_completes_through_backend() {
        let client = ConversionClient::new(Arc::new(SimulatedBackend::new(Duration::from_millis(1))));
        let id = JobLedger::new().next_id();
        let outcome =
            ConversionTask::new(id, client.dispatch(Workflow::Document, upload("a.pdf"))).await;
        assert_eq!(outcome.id, id);
        match outcome.settlement {
            Settlement::Completed { artifact } => assert_eq!(artifact.filename(), "a.docx"),
            other => panic!("expected completion, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn dispatch_maps_backend_failure() {
        let client = ConversionClient::new(Arc::new(FailingBackend));
        let settlement = client.dispatch(Workflow::Document, upload("a.pdf")).await;
        match settlement {
            Settlement::Failed { reason } => assert_eq!(reason.status(), Some(503)),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn dispatch_maps_header_decode_failure() {
        struct BadHeader;

        #[async_trait]
        impl ConversionBackend for BadHeader {
            async fn convert(&self, _: Workflow, _: Upload) -> Result<RawResponse, JobFailure> {
                Ok(RawResponse {
                    body: Bytes::from_static(b"brf"),
                    content_type: None,
                    content_disposition: Some("attachment; filename=%E0%A4%A.brf".into()),
                })
            }
        }

        let client = ConversionClient::new(Arc::new(BadHeader));
        let settlement = client.dispatch(Workflow::Braille, upload("n.docx")).await;
        assert!(matches!(
            settlement,
            Settlement::Failed {
                reason: JobFailure::DecodeFailed { .. }
            }
        ));
    }
}
