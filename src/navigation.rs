//! Page routes of the front end.
//!
//! Six pages, none taking parameters. Two of them host a conversion
//! workflow; the rest are placeholders until their features exist.

use crate::workflow::Workflow;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Main,
    Convert,
    Braille,
    Record,
    Lectures,
    Lms,
}

impl Route {
    /// Every route, in menu order.
    pub const ALL: [Route; 6] = [
        Route::Main,
        Route::Convert,
        Route::Braille,
        Route::Record,
        Route::Lectures,
        Route::Lms,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Route::Main => "/",
            Route::Convert => "/convert",
            Route::Braille => "/braille",
            Route::Record => "/record",
            Route::Lectures => "/lectures",
            Route::Lms => "/lms",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Route::Main => "Home",
            Route::Convert => "File conversion",
            Route::Braille => "Braille conversion",
            Route::Record => "Voice recording",
            Route::Lectures => "Lecture materials",
            Route::Lms => "LMS integration",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Route::Main => "Main menu.",
            Route::Convert => {
                "Describes visual material in PPT and PDF files as text and converts them to DOCX."
            }
            Route::Braille => "Converts DOCX documents to braille.",
            Route::Record => {
                "Records audio live; once finished, cues are processed and a summary is produced."
            }
            Route::Lectures => "Loads the course list from the LMS and sorts materials by week.",
            Route::Lms => "Connects to the learning management system.",
        }
    }

    /// Workflow hosted by this page, if any.
    pub fn workflow(self) -> Option<Workflow> {
        match self {
            Route::Convert => Some(Workflow::Document),
            Route::Braille => Some(Workflow::Braille),
            _ => None,
        }
    }

    /// `true` for pages with no behaviour yet.
    pub fn is_placeholder(self) -> bool {
        matches!(self, Route::Record | Route::Lectures | Route::Lms)
    }

    /// Resolve a path; a trailing slash is ignored. Unknown paths give `None`.
    pub fn from_path(path: &str) -> Option<Route> {
        let trimmed = path.trim_end_matches('/');
        let normalised = if trimmed.is_empty() { "/" } else { trimmed };
        Self::ALL.into_iter().find(|r| r.path() == normalised)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_round_trip() {
        for r in Route::ALL {
            assert_eq!(Route::from_path(r.path()), Some(r));
        }
    }

    #[test]
    fn trailing_slash_and_unknown() {
        assert_eq!(Route::from_path("/braille/"), Some(Route::Braille));
        assert_eq!(Route::from_path(""), Some(Route::Main));
        assert_eq!(Route::from_path("/admin"), None);
    }

    #[test]
    fn only_two_pages_host_workflows() {
        let hosting: Vec<Route> = Route::ALL
            .into_iter()
            .filter(|r| r.workflow().is_some())
            .collect();
        assert_eq!(hosting, vec![Route::Convert, Route::Braille]);
        assert!(Route::Lms.is_placeholder());
        assert!(!Route::Main.is_placeholder());
    }
}
