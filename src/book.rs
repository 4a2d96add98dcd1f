//! Catalog records produced by the parsers

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One results page as presented by the portal
pub type Page = Vec<Book>;

/// Lending status shown in a book's detail panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookStatus {
    Available,
    Owned,
    Reserved,
    Taken,
    Unavailable,
}

impl BookStatus {
    /// Maps the (Italian) panel text to a status, `None` when unrecognized
    pub fn from_panel_text(text: &str) -> Option<Self> {
        let text = text.trim().to_lowercase();
        if text.contains("scarica") {
            Some(BookStatus::Available)
        } else if text.contains("ripeti") {
            Some(BookStatus::Owned)
        } else if text.contains("prenotato") {
            Some(BookStatus::Reserved)
        } else if text.contains("occupato") {
            Some(BookStatus::Taken)
        } else if text.contains("non disponibile") {
            Some(BookStatus::Unavailable)
        } else {
            None
        }
    }
}

impl fmt::Display for BookStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BookStatus::Available => "available",
            BookStatus::Owned => "owned",
            BookStatus::Reserved => "reserved",
            BookStatus::Taken => "taken",
            BookStatus::Unavailable => "unavailable",
        };
        f.write_str(name)
    }
}

/// Extended metadata scraped from a book's detail page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BookDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<BookStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    /// In page order, without duplicates
    #[serde(rename = "ISBNs")]
    pub isbns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// Each entry is one category path, outermost first
    pub categories: Vec<Vec<String>>,
    /// Lowercased format names as listed by the portal, e.g. `epub`
    pub formats: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drm: Option<bool>,
}

/// A catalog entry
///
/// `details` is only present for records that went through a detail fetch,
/// so the extended fields are always populated together or not at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Book {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    #[serde(flatten)]
    pub details: Option<BookDetails>,
}

impl Book {
    pub fn new(id: impl Into<String>, title: impl Into<String>, authors: Vec<String>) -> Self {
        Book {
            id: id.into(),
            title: title.into(),
            authors,
            details: None,
        }
    }

    pub fn with_details(mut self, details: BookDetails) -> Self {
        self.details = Some(details);
        self
    }

    pub fn is_detailed(&self) -> bool {
        self.details.is_some()
    }

    pub fn status(&self) -> Option<BookStatus> {
        self.details.as_ref().and_then(|d| d.status)
    }

    pub fn publisher(&self) -> Option<&str> {
        self.details.as_ref().and_then(|d| d.publisher.as_deref())
    }

    pub fn isbns(&self) -> &[String] {
        self.details.as_ref().map(|d| d.isbns.as_slice()).unwrap_or(&[])
    }

    pub fn language(&self) -> Option<&str> {
        self.details.as_ref().and_then(|d| d.language.as_deref())
    }

    pub fn description(&self) -> Option<&str> {
        self.details.as_ref().and_then(|d| d.description.as_deref())
    }

    pub fn year(&self) -> Option<i32> {
        self.details.as_ref().and_then(|d| d.year)
    }

    pub fn formats(&self) -> &[String] {
        self.details.as_ref().map(|d| d.formats.as_slice()).unwrap_or(&[])
    }
}

/// A place in the waiting queue of a book lent to someone else
///
/// `book` only carries what the account page shows: id, title and authors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reservation {
    /// Id the portal cancels the reservation by
    pub id: String,
    pub book: Book,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDateTime>,
    /// Status label as shown on the account page, e.g. `attiva`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// 1-based; absent when the portal did not say
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_position: Option<u32>,
}

impl Reservation {
    pub fn is_active(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|status| status.trim().eq_ignore_ascii_case("attiva"))
    }
}
