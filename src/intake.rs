//! Upload intake: choose the one file the next conversion will send.
//!
//! Files arrive either from a path (the file-picker case; the MIME type is
//! guessed from the extension) or as an in-memory [`CandidateFile`] with a
//! declared type (the drag-and-drop case). Either way they pass through
//! [`UploadIntake::select`], which applies the workflow's acceptance policy
//! and keeps at most one [`PendingFile`]. A rejected candidate never
//! disturbs the file that was already selected.

use crate::error::ConvertError;
use crate::workflow::Workflow;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A file offered to intake, not yet validated.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub name: String,
    pub mime: String,
    pub bytes: Bytes,
}

impl CandidateFile {
    /// A candidate with a declared MIME type, e.g. from a drop event.
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a candidate from disk, guessing its MIME type from the extension.
    ///
    /// Files larger than `max_bytes` are refused before they are read.
    pub async fn from_path(path: impl AsRef<Path>, max_bytes: u64) -> Result<Self, ConvertError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| ConvertError::FileNotFound {
                path: path.to_path_buf(),
            })?;

        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| io_to_convert_error(path, e))?;
        if !meta.is_file() {
            return Err(ConvertError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        if meta.len() > max_bytes {
            return Err(ConvertError::FileTooLarge {
                name,
                size: meta.len(),
                limit: max_bytes,
            });
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| io_to_convert_error(path, e))?;
        let mime = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        debug!("Read {} ({} bytes, {})", path.display(), bytes.len(), mime);
        Ok(Self {
            name,
            mime,
            bytes: Bytes::from(bytes),
        })
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

fn io_to_convert_error(path: &Path, e: std::io::Error) -> ConvertError {
    let path: PathBuf = path.to_path_buf();
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => ConvertError::PermissionDenied { path },
        _ => ConvertError::FileNotFound { path },
    }
}

/// The selected, not yet submitted file.
#[derive(Debug, Clone)]
pub struct PendingFile {
    name: String,
    mime: String,
    bytes: Bytes,
}

impl PendingFile {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }
}

/// Holds at most one [`PendingFile`] for a workflow.
#[derive(Debug)]
pub struct UploadIntake {
    workflow: Workflow,
    max_upload_bytes: u64,
    pending: Option<PendingFile>,
}

impl UploadIntake {
    pub fn new(workflow: Workflow, max_upload_bytes: u64) -> Self {
        Self {
            workflow,
            max_upload_bytes,
            pending: None,
        }
    }

    /// Validate `candidate` and make it the pending file.
    ///
    /// On success any previous selection is replaced. On failure the previous
    /// selection, if any, is kept.
    pub fn select(&mut self, candidate: CandidateFile) -> Result<&PendingFile, ConvertError> {
        if candidate.size() > self.max_upload_bytes {
            return Err(ConvertError::FileTooLarge {
                name: candidate.name,
                size: candidate.bytes.len() as u64,
                limit: self.max_upload_bytes,
            });
        }
        self.workflow
            .check(&candidate.name, &candidate.mime)
            .map_err(|reason| ConvertError::UnsupportedFileType {
                name: candidate.name.clone(),
                reason,
            })?;

        debug!(
            "Selected {} for {} conversion ({} bytes)",
            candidate.name,
            self.workflow,
            candidate.size()
        );
        Ok(self.pending.insert(PendingFile {
            name: candidate.name,
            mime: candidate.mime,
            bytes: candidate.bytes,
        }))
    }

    pub fn pending(&self) -> Option<&PendingFile> {
        self.pending.as_ref()
    }

    /// Remove and return the pending file (done when a request is issued).
    pub fn take(&mut self) -> Option<PendingFile> {
        self.pending.take()
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }
}
