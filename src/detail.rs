//! Per-book detail page fetching
use crate::book::Book;
use crate::errors::MlolError;
use crate::extraction::{BookPage, parse_book_page};
use crate::networking::{ALERT_PAGE, BOOK_ENDPOINT, Fetch, PageRequest};
use log::{debug, warn};

/// Fetch and parse the detail page of book `id`
///
/// Items the user's library does not offer redirect to an alert page; that
/// is reported as an error rather than an empty record.
pub fn fetch_book_page<F: Fetch + ?Sized>(fetcher: &F, id: &str) -> Result<BookPage, MlolError> {
    debug!("Fetching book {id}");
    let fetched = fetcher.fetch(&PageRequest::new(BOOK_ENDPOINT).query("id", id))?;

    if fetched.url.contains(ALERT_PAGE) {
        warn!("Failed to fetch book {id}. Might not be available to your library.");
        return Err(MlolError::Parse(format!(
            "book {id} is not available to this library"
        )));
    }
    if !fetched.is_success() {
        return Err(MlolError::Status {
            url: fetched.url,
            status: fetched.status,
        });
    }

    parse_book_page(&fetched.text())
}

/// A fully detailed record for book `id`
pub fn fetch_book<F: Fetch + ?Sized>(fetcher: &F, id: &str) -> Result<Book, MlolError> {
    fetch_book_page(fetcher, id).map(|page| page.into_book(id))
}

/// Attach detail fields to a search record, keeping its id, title and authors
pub fn enrich<F: Fetch + ?Sized>(fetcher: &F, book: Book) -> Result<Book, MlolError> {
    let page = fetch_book_page(fetcher, &book.id)?;
    Ok(book.with_details(page.details))
}

/// Detail page URL for sharing or opening in a browser
pub fn book_url(base_url: &str, id: &str) -> String {
    format!("{base_url}{BOOK_ENDPOINT}?id={id}")
}
