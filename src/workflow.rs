//! The two upload workflows and the rules that differ between them.
//!
//! | Workflow   | Accepts                         | Endpoint        | Produces |
//! |------------|---------------------------------|-----------------|----------|
//! | `Document` | PDF, PPT, PPTX (by MIME type)   | `POST /process` | `.docx`  |
//! | `Braille`  | `*.docx` (by file extension)    | `POST /braille` | `.brf`   |
//!
//! Everything else (intake, ledger, client, retrieval) is shared.

use serde::{Deserialize, Serialize};
use std::fmt;

/// MIME types accepted by the general document workflow.
pub const DOCUMENT_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
];

/// Extensions (lowercase, with dot) accepted by the braille workflow.
pub const BRAILLE_EXTENSIONS: &[&str] = &[".docx"];

/// Content type of the document the `/process` endpoint returns.
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Content type assumed for braille ready files.
pub const BRF_MIME: &str = "text/plain";

/// Which conversion a page performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Workflow {
    /// PDF / PowerPoint → DOCX with visual material described as text.
    Document,
    /// DOCX → braille ready file.
    Braille,
}

impl Workflow {
    /// Endpoint path on the conversion backend.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Workflow::Document => "/process",
            Workflow::Braille => "/braille",
        }
    }

    /// Extension (without dot) of the artifact this workflow produces.
    pub fn target_extension(&self) -> &'static str {
        match self {
            Workflow::Document => "docx",
            Workflow::Braille => "brf",
        }
    }

    /// Content type recorded on the artifact when the backend sends none.
    pub fn artifact_content_type(&self) -> &'static str {
        match self {
            Workflow::Document => DOCX_MIME,
            Workflow::Braille => BRF_MIME,
        }
    }

    /// Human-readable list of accepted inputs, used in rejection messages.
    pub fn accepted_description(&self) -> &'static str {
        match self {
            Workflow::Document => "PDF, PPT, PPTX",
            Workflow::Braille => "DOCX",
        }
    }

    /// Check a candidate's name and MIME type against this workflow's policy.
    ///
    /// Returns the rejection reason on failure.
    pub fn check(&self, name: &str, mime: &str) -> Result<(), String> {
        match self {
            Workflow::Document => {
                if DOCUMENT_MIME_TYPES.contains(&mime) {
                    Ok(())
                } else {
                    Err(format!(
                        "{mime} is not supported (only {} are accepted)",
                        self.accepted_description()
                    ))
                }
            }
            Workflow::Braille => {
                if BRAILLE_EXTENSIONS
                    .iter()
                    .any(|ext| strip_suffix_ignore_case(name, ext).is_some())
                {
                    Ok(())
                } else {
                    Err(format!(
                        "braille conversion only supports {} files",
                        self.accepted_description()
                    ))
                }
            }
        }
    }

    /// Derive the output filename from the uploaded file's name.
    ///
    /// The document workflow swaps whatever extension the input had for
    /// `.docx` (or appends it when there is none). The braille workflow
    /// replaces a trailing `.docx`, in any letter case, with `.brf`.
    pub fn derive_filename(&self, original: &str) -> String {
        match self {
            Workflow::Document => {
                let base = match original.rfind('.') {
                    Some(idx) => &original[..idx],
                    None => original,
                };
                format!("{base}.{}", self.target_extension())
            }
            Workflow::Braille => {
                match BRAILLE_EXTENSIONS
                    .iter()
                    .find_map(|ext| strip_suffix_ignore_case(original, ext))
                {
                    Some(base) => format!("{base}.{}", self.target_extension()),
                    None => original.to_string(),
                }
            }
        }
    }
}

/// `name` without `suffix` when it ends with it, ignoring ASCII case.
fn strip_suffix_ignore_case<'a>(name: &'a str, suffix: &str) -> Option<&'a str> {
    let split = name.len().checked_sub(suffix.len())?;
    if !name.is_char_boundary(split) {
        return None;
    }
    let (base, tail) = name.split_at(split);
    tail.eq_ignore_ascii_case(suffix).then_some(base)
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Workflow::Document => write!(f, "document"),
            Workflow::Braille => write!(f, "braille"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_name_swaps_extension() {
        assert_eq!(Workflow::Document.derive_filename("lecture.pptx"), "lecture.docx");
        assert_eq!(Workflow::Document.derive_filename("week.3.pdf"), "week.3.docx");
        assert_eq!(Workflow::Document.derive_filename("README"), "README.docx");
    }

    #[test]
    fn braille_name_swaps_docx_case_insensitively() {
        assert_eq!(Workflow::Braille.derive_filename("notes.docx"), "notes.brf");
        assert_eq!(Workflow::Braille.derive_filename("Notes.DOCX"), "Notes.brf");
    }

    #[test]
    fn braille_name_handles_multibyte_names() {
        assert_eq!(Workflow::Braille.derive_filename("강의노트.docx"), "강의노트.brf");
        assert_eq!(Workflow::Braille.derive_filename("강"), "강");
    }

    #[test]
    fn braille_name_without_docx_is_kept() {
        assert_eq!(Workflow::Braille.derive_filename("notes.txt"), "notes.txt");
    }

    #[test]
    fn document_policy_is_mime_based() {
        assert!(Workflow::Document.check("a.pdf", "application/pdf").is_ok());
        assert!(Workflow::Document
            .check("a.ppt", "application/vnd.ms-powerpoint")
            .is_ok());
        let err = Workflow::Document.check("a.png", "image/png").unwrap_err();
        assert!(err.contains("image/png"));
        // name is irrelevant for the document workflow
        assert!(Workflow::Document.check("a.pdf", "text/plain").is_err());
    }

    #[test]
    fn braille_policy_is_extension_based() {
        assert!(Workflow::Braille.check("a.docx", "").is_ok());
        assert!(Workflow::Braille.check("A.DocX", "application/octet-stream").is_ok());
        assert!(Workflow::Braille.check("a.hwp", DOCX_MIME).is_err());
    }

    #[test]
    fn endpoints() {
        assert_eq!(Workflow::Document.endpoint(), "/process");
        assert_eq!(Workflow::Braille.endpoint(), "/braille");
    }
}
