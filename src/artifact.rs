//! Converted artifacts and saving them to disk.
//!
//! An [`ArtifactHandle`] holds the bytes returned by the backend plus the
//! filename and content type they should be saved under. It lives on its
//! [`crate::ledger::ConversionJob`] until the first successful download,
//! after which the session releases it: every artifact can be saved once.
//!
//! Saving is atomic: bytes go to a temporary file in the destination
//! directory which is then renamed into place, so an interrupted download
//! never leaves a truncated file under the final name. Existing files are
//! never replaced; a taken name gets a ` (n)` suffix before the extension.

use crate::error::ConvertError;
use bytes::Bytes;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Suffixes tried before giving up on a crowded directory.
const MAX_NAME_ATTEMPTS: usize = 1000;

/// Downloadable output of one completed job.
#[derive(Clone)]
pub struct ArtifactHandle {
    bytes: Bytes,
    filename: String,
    content_type: String,
}

impl ArtifactHandle {
    pub fn new(bytes: Bytes, filename: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            filename: filename.into(),
            content_type: content_type.into(),
        }
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// Name the artifact is saved under.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl fmt::Debug for ArtifactHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArtifactHandle")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Result of asking for a job's artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// The artifact was written to this path and its handle released.
    Saved(PathBuf),
    /// The job is not completed, or its artifact was already downloaded.
    Unavailable,
}

/// Reduce a (possibly server-supplied) name to a bare file name.
///
/// Directory components are dropped so a header like
/// `filename="../../etc/passwd"` cannot escape the download directory.
/// Returns `None` when nothing usable remains or the name contains control
/// characters (NUL included), which no filesystem will take.
pub fn sanitize_filename(name: &str) -> Option<String> {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if base.is_empty() || base == "." || base == ".." || base.chars().any(char::is_control) {
        return None;
    }
    Some(base.to_string())
}

/// `week1.docx`, 2 → `week1 (2).docx`. A leading dot is not an extension.
fn numbered_name(filename: &str, n: usize) -> String {
    if n == 0 {
        return filename.to_string();
    }
    match filename.rfind('.').filter(|&idx| idx > 0) {
        Some(idx) => format!("{} ({n}){}", &filename[..idx], &filename[idx..]),
        None => format!("{filename} ({n})"),
    }
}

/// Write `artifact` into `dir` under its filename.
///
/// The directory is created if needed. An existing file is never replaced:
/// the first free name of `name`, `name (1)`, `name (2)`, ... is used, and
/// the path actually written is returned.
pub async fn save(artifact: &ArtifactHandle, dir: &Path) -> Result<PathBuf, ConvertError> {
    let target = dir.join(artifact.filename());

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| ConvertError::OutputWriteFailed {
            path: target.clone(),
            source: e,
        })?;

    let bytes = artifact.bytes().clone();
    let filename = artifact.filename().to_string();
    let dir = dir.to_path_buf();
    debug!("Writing {} bytes for {}", bytes.len(), target.display());

    // tempfile is blocking; keep it off the async workers.
    let written = tokio::task::spawn_blocking(move || -> std::io::Result<PathBuf> {
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        for n in 0..MAX_NAME_ATTEMPTS {
            let dest = dir.join(numbered_name(&filename, n));
            match tmp.persist_noclobber(&dest) {
                Ok(_) => return Ok(dest),
                Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => tmp = e.file,
                Err(e) => return Err(e.error),
            }
        }
        Err(std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            format!("no free name for {filename} after {MAX_NAME_ATTEMPTS} attempts"),
        ))
    })
    .await
    .map_err(|e| ConvertError::Internal(format!("download task panicked: {e}")))?
    .map_err(|e| ConvertError::OutputWriteFailed {
        path: target.clone(),
        source: e,
    })?;

    if written != target {
        info!("{} exists, saved as {}", target.display(), written.display());
    } else {
        info!("Saved {}", written.display());
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_directories() {
        assert_eq!(sanitize_filename("notes.brf").as_deref(), Some("notes.brf"));
        assert_eq!(
            sanitize_filename("../../etc/passwd").as_deref(),
            Some("passwd")
        );
        assert_eq!(
            sanitize_filename(r"C:\Users\x\notes.brf").as_deref(),
            Some("notes.brf")
        );
        assert_eq!(sanitize_filename("  spaced.brf ").as_deref(), Some("spaced.brf"));
    }

    #[test]
    fn sanitize_rejects_empty_and_dots() {
        assert_eq!(sanitize_filename(""), None);
        assert_eq!(sanitize_filename("dir/"), None);
        assert_eq!(sanitize_filename(".."), None);
        assert_eq!(sanitize_filename("."), None);
    }

    #[test]
    fn sanitize_rejects_control_characters() {
        assert_eq!(sanitize_filename("a\0b.brf"), None);
        assert_eq!(sanitize_filename("line\nbreak.brf"), None);
        assert_eq!(sanitize_filename("tab\there.brf"), None);
    }

    #[test]
    fn numbered_names_keep_the_extension() {
        assert_eq!(numbered_name("week1.docx", 0), "week1.docx");
        assert_eq!(numbered_name("week1.docx", 2), "week1 (2).docx");
        assert_eq!(numbered_name("archive.tar.gz", 1), "archive.tar (1).gz");
        assert_eq!(numbered_name("README", 1), "README (1)");
        assert_eq!(numbered_name(".hidden", 1), ".hidden (1)");
    }

    #[test]
    fn debug_hides_bytes() {
        let a = ArtifactHandle::new(Bytes::from_static(b"secret"), "a.docx", "x/y");
        let dbg = format!("{a:?}");
        assert!(dbg.contains("a.docx"));
        assert!(!dbg.contains("secret"));
    }

    #[tokio::test]
    async fn save_writes_bytes_under_filename() {
        let dir = tempfile::tempdir().unwrap();
        let a = ArtifactHandle::new(Bytes::from_static(b"braille"), "notes.brf", "text/plain");

        let path = save(&a, dir.path()).await.expect("save ok");
        assert_eq!(path, dir.path().join("notes.brf"));
        assert_eq!(std::fs::read(&path).unwrap(), b"braille");
    }

    #[tokio::test]
    async fn save_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("out").join("week1");
        let a = ArtifactHandle::new(Bytes::from_static(b"x"), "a.docx", "x/y");

        let path = save(&a, &nested).await.expect("save ok");
        assert!(path.exists());
    }

    #[tokio::test]
    async fn save_never_replaces_an_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("week1.docx"), b"mine").unwrap();

        let first = ArtifactHandle::new(Bytes::from_static(b"pdf"), "week1.docx", "x/y");
        let second = ArtifactHandle::new(Bytes::from_static(b"ppt"), "week1.docx", "x/y");
        let p1 = save(&first, dir.path()).await.unwrap();
        let p2 = save(&second, dir.path()).await.unwrap();

        assert_eq!(p1, dir.path().join("week1 (1).docx"));
        assert_eq!(p2, dir.path().join("week1 (2).docx"));
        assert_eq!(std::fs::read(dir.path().join("week1.docx")).unwrap(), b"mine");
        assert_eq!(std::fs::read(&p1).unwrap(), b"pdf");
        assert_eq!(std::fs::read(&p2).unwrap(), b"ppt");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 3);
    }

    #[tokio::test]
    async fn save_into_a_file_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();
        let a = ArtifactHandle::new(Bytes::from_static(b"x"), "a.docx", "x/y");

        let err = save(&a, &blocker).await.unwrap_err();
        assert!(matches!(err, ConvertError::OutputWriteFailed { .. }));
    }
}
