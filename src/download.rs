//! Ebook download
//!
//! Only the two formats the portal hands out directly are supported. The
//! payload is returned as-is: for DRM-protected titles that is the ACSM
//! fulfillment token, otherwise the ebook file. Nothing is written to disk.
use crate::book::{Book, BookStatus};
use crate::detail::fetch_book_page;
use crate::errors::MlolError;
use crate::networking::{DOWNLOAD_ENDPOINT, DOWNLOAD_REFERER_ENDPOINT, Fetch, PageRequest};
use log::{debug, info};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadFormat {
    Epub,
    Pdf,
}

impl DownloadFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DownloadFormat::Epub => "epub",
            DownloadFormat::Pdf => "pdf",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "epub" => Some(DownloadFormat::Epub),
            "pdf" => Some(DownloadFormat::Pdf),
            _ => None,
        }
    }

    /// First supported format in the order the portal lists them
    pub fn pick(formats: &[String]) -> Option<Self> {
        formats.iter().find_map(|name| Self::from_name(name))
    }
}

impl fmt::Display for DownloadFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bytes of a downloaded book and the format they were requested in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub format: DownloadFormat,
    pub bytes: Vec<u8>,
}

fn failed(id: &str, reason: impl Into<String>) -> MlolError {
    MlolError::Download {
        id: id.to_string(),
        reason: reason.into(),
    }
}

/// The portal answers refused downloads with an ordinary HTML page
fn looks_like_html(body: &[u8]) -> bool {
    let start = String::from_utf8_lossy(&body[..body.len().min(64)])
        .trim_start()
        .to_lowercase();
    start.starts_with("<!doctype html") || start.starts_with("<html")
}

/// Download book `id` in its first supported format
///
/// The detail page is fetched first so the decision rests on the current
/// lending status rather than on whatever a cached record says.
pub fn download_by_id<F: Fetch + ?Sized>(fetcher: &F, id: &str) -> Result<DownloadedFile, MlolError> {
    if !fetcher.is_authenticated() {
        return Err(failed(id, "an authenticated session is required to download books"));
    }

    let details = fetch_book_page(fetcher, id)
        .map_err(|e| e.into_download(id))?
        .details;

    match details.status {
        Some(BookStatus::Available) => {}
        Some(BookStatus::Owned) => {
            return Err(failed(
                id,
                "the book is already on loan to this account and re-downloading it is not supported",
            ));
        }
        Some(status) => {
            return Err(failed(id, format!("the book cannot be borrowed (status: {status})")));
        }
        None => return Err(failed(id, "the lending status of the book is unknown")),
    }

    let format = DownloadFormat::pick(&details.formats).ok_or_else(|| {
        failed(
            id,
            format!("no supported format among {:?}", details.formats),
        )
    })?;

    let referer = format!(
        "{}{DOWNLOAD_REFERER_ENDPOINT}?unid={id}&form={format}",
        fetcher.base_url()
    );
    let request = PageRequest::new(DOWNLOAD_ENDPOINT)
        .query("unid", id)
        .query("form", format.as_str())
        .header("Referer", referer);
    let fetched = fetcher.fetch(&request).map_err(|e| e.into_download(id))?;
    debug!("Download of {id} answered {} from {}", fetched.status, fetched.url);

    if !fetched.is_success() {
        return Err(failed(id, format!("HTTP {} from {}", fetched.status, fetched.url)));
    }
    if fetched.body.is_empty() {
        return Err(failed(id, "the portal sent an empty file"));
    }
    if looks_like_html(&fetched.body) {
        return Err(failed(id, "the portal sent a web page instead of the file"));
    }

    info!("Book {id} downloaded ({format}, {} bytes)", fetched.body.len());
    Ok(DownloadedFile {
        format,
        bytes: fetched.body,
    })
}

pub fn download_book<F: Fetch + ?Sized>(fetcher: &F, book: &Book) -> Result<DownloadedFile, MlolError> {
    download_by_id(fetcher, &book.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_first_supported_format_in_listed_order() {
        let formats = vec!["mobi".to_string(), "pdf".to_string(), "epub".to_string()];
        assert_eq!(DownloadFormat::pick(&formats), Some(DownloadFormat::Pdf));
        assert_eq!(DownloadFormat::pick(&["mobi".to_string()]), None);
        assert_eq!(DownloadFormat::pick(&[]), None);
    }

    #[test]
    fn html_bodies_are_recognized() {
        assert!(looks_like_html(b"\n  <!DOCTYPE html><html></html>"));
        assert!(looks_like_html(b"<HTML><body>Accesso negato</body>"));
        assert!(!looks_like_html(b"<fulfillmentToken fulfillmentType=\"loan\">"));
        assert!(!looks_like_html(b"PK\x03\x04mimetypeapplication/epub+zip"));
    }
}
