//! Conversion backends: where an upload actually goes.
//!
//! [`ConversionBackend`] is the seam between the session's bookkeeping and
//! the network. [`HttpBackend`] talks to the real service with one multipart
//! `POST` per job; [`SimulatedBackend`] waits a fixed delay and returns a
//! synthetic document, standing in for the service in demos and tests.
//!
//! A backend reports raw outcomes only. Turning a [`RawResponse`] into a
//! named artifact is the client's job ([`crate::client`]).

use crate::config::ClientConfig;
use crate::error::{ConvertError, JobFailure};
use crate::workflow::Workflow;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use tracing::{debug, warn};

/// Name of the multipart field carrying the document.
pub const UPLOAD_FIELD: &str = "file";

/// One file on its way to the backend.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub mime: String,
    pub bytes: Bytes,
}

/// What came back from a successful request, before interpretation.
#[derive(Debug, Clone, Default)]
pub struct RawResponse {
    pub body: Bytes,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
}

/// Sends one upload to a conversion service.
#[async_trait]
pub trait ConversionBackend: Send + Sync {
    /// Issue exactly one conversion request. No retries.
    async fn convert(&self, workflow: Workflow, upload: Upload)
        -> Result<RawResponse, JobFailure>;
}

/// The real service, reached over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> Result<Self, ConvertError> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| ConvertError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn build_form(upload: Upload) -> Result<Form, JobFailure> {
        let mime = if upload.mime.is_empty() {
            "application/octet-stream"
        } else {
            upload.mime.as_str()
        };
        let part = Part::bytes(upload.bytes.to_vec())
            .file_name(upload.name.clone())
            .mime_str(mime)
            .map_err(|e| JobFailure::RequestFailed {
                status: None,
                detail: format!("invalid MIME type '{mime}': {e}"),
            })?;
        Ok(Form::new().part(UPLOAD_FIELD, part))
    }
}

#[async_trait]
impl ConversionBackend for HttpBackend {
    async fn convert(
        &self,
        workflow: Workflow,
        upload: Upload,
    ) -> Result<RawResponse, JobFailure> {
        let url = self.config.endpoint_url(workflow.endpoint());
        debug!("POST {} ({}, {} bytes)", url, upload.name, upload.bytes.len());

        let form = Self::build_form(upload)?;
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                let detail = if e.is_timeout() {
                    format!("request to {url} timed out")
                } else {
                    format!("request to {url} failed: {e}")
                };
                warn!("{}", detail);
                JobFailure::RequestFailed {
                    status: None,
                    detail,
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!("{} answered HTTP {}", url, status);
            return Err(JobFailure::RequestFailed {
                status: Some(status.as_u16()),
                detail: format!("HTTP {status}"),
            });
        }

        let content_type = header_string(response.headers(), CONTENT_TYPE);
        let content_disposition = header_string(response.headers(), CONTENT_DISPOSITION);

        let body = response
            .bytes()
            .await
            .map_err(|e| JobFailure::DecodeFailed {
                detail: format!("reading response body: {e}"),
            })?;

        debug!("{} returned {} bytes", url, body.len());
        Ok(RawResponse {
            body,
            content_type,
            content_disposition,
        })
    }
}

fn header_string(headers: &HeaderMap, name: HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Stand-in backend: waits, then "converts" into a small placeholder document.
#[derive(Debug, Clone)]
pub struct SimulatedBackend {
    delay: Duration,
}

impl SimulatedBackend {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

#[async_trait]
impl ConversionBackend for SimulatedBackend {
    async fn convert(
        &self,
        workflow: Workflow,
        upload: Upload,
    ) -> Result<RawResponse, JobFailure> {
        tokio::time::sleep(self.delay).await;
        let body = format!(
            "Simulated {workflow} conversion of {} ({} bytes)\n",
            upload.name,
            upload.bytes.len()
        );
        Ok(RawResponse {
            body: Bytes::from(body),
            content_type: Some("text/plain".to_string()),
            content_disposition: None,
        })
    }
}
