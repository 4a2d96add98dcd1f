//! # mlol_client
//!
//! A blocking client for MLOL (medialibrary.it), the Italian digital lending
//! portal used by public libraries.
//!
//! It can:
//! - log into a library's portal with the user's own credentials
//! - search the catalog, page by page, optionally reading every record's
//!   detail page as well
//! - download borrowable ebooks in EPUB or PDF
//! - reserve taken books, list and cancel reservations
//!
//! ## Usage
//!
//! ```no_run
//! use mlol_client::MlolClient;
//!
//! let client = MlolClient::anonymous().expect("Failed to create client");
//! let mut pages = client.search_books("9788845982484", false);
//! if let Some(page) = pages.next() {
//!     let page = page.expect("search failed");
//!     println!("{}", page[0].title);
//! }
//! ```

pub mod book;
pub mod client;
pub mod config;
pub mod detail;
pub mod download;
pub mod errors;
pub mod extraction;
pub mod networking;
pub mod reservation;
pub mod search;
mod utils;

pub use book::{Book, BookDetails, BookStatus, Page, Reservation};
pub use client::MlolClient;
pub use config::ClientConfig;
pub use download::{DownloadFormat, DownloadedFile};
pub use errors::{MlolError, Result};
pub use networking::{Fetch, Fetched, LoginInfo, PageRequest, Session};
pub use reservation::ReserveOutcome;
pub use search::{SearchPages, SearchQuery, SearchState};
