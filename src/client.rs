//! The public entry point tying session, search, detail, download and
//! reservations together
use crate::book::{Book, Reservation};
use crate::config::ClientConfig;
use crate::detail::{book_url, fetch_book};
use crate::download::{DownloadedFile, download_book, download_by_id};
use crate::errors::MlolError;
use crate::networking::{Fetch, Session};
use crate::reservation::{self, ReserveOutcome};
use crate::search::{SearchPages, SearchQuery};

/// Client for one MLOL portal
///
/// The session (and its cookies) lives as long as the client. Use it from a
/// single thread; concurrent use is not supported.
///
/// # Example
/// ```no_run
/// use mlol_client::{ClientConfig, MlolClient};
///
/// let client = MlolClient::new(
///     ClientConfig::new()
///         .with_domain("bologna.medialibrary.it")
///         .with_credentials("user", "secret"),
/// )
/// .expect("login failed");
///
/// for page in client.search_books("Quammen", true) {
///     for book in page.expect("search failed") {
///         println!("{} - {:?} ({:?})", book.title, book.authors, book.year());
///     }
/// }
/// ```
#[derive(Debug)]
pub struct MlolClient {
    session: Session,
}

impl MlolClient {
    /// Creates a client, logging in when `config` carries credentials
    pub fn new(config: ClientConfig) -> Result<Self, MlolError> {
        Ok(MlolClient {
            session: Session::open(&config)?,
        })
    }

    /// Public catalog client on the default portal
    pub fn anonymous() -> Result<Self, MlolError> {
        Ok(MlolClient {
            session: Session::anonymous(&ClientConfig::default())?,
        })
    }

    pub fn from_session(session: Session) -> Self {
        MlolClient { session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Lazily pages through the results for `term`
    ///
    /// With `deep` every record also carries its detail fields, fetched one
    /// record at a time while the page is being produced.
    pub fn search_books(&self, term: &str, deep: bool) -> SearchPages<'_, Session> {
        SearchPages::new(&self.session, SearchQuery::new(term, deep))
    }

    /// Lazily pages through the titles added in the last fifteen days
    pub fn latest_books(&self, deep: bool) -> SearchPages<'_, Session> {
        SearchPages::new(&self.session, SearchQuery::latest(deep))
    }

    pub fn get_book_by_id(&self, id: &str) -> Result<Book, MlolError> {
        fetch_book(&self.session, id)
    }

    /// Re-reads `book` from its detail page
    pub fn get_book(&self, book: &Book) -> Result<Book, MlolError> {
        self.get_book_by_id(&book.id)
    }

    pub fn download_book(&self, book: &Book) -> Result<DownloadedFile, MlolError> {
        download_book(&self.session, book)
    }

    pub fn download_book_by_id(&self, id: &str) -> Result<DownloadedFile, MlolError> {
        download_by_id(&self.session, id)
    }

    /// Reservations held by the logged-in account, with queue positions
    pub fn reservations(&self) -> Result<Vec<Reservation>, MlolError> {
        reservation::reservations(&self.session)
    }

    /// Joins the waiting queue of a taken book; `email` gets the notification
    pub fn reserve_book(&self, book: &Book, email: &str) -> Result<ReserveOutcome, MlolError> {
        reservation::reserve_book(&self.session, book, email)
    }

    pub fn reserve_book_by_id(&self, id: &str, email: &str) -> Result<ReserveOutcome, MlolError> {
        reservation::reserve_by_id(&self.session, id, email)
    }

    pub fn cancel_reservation(&self, held: &Reservation) -> Result<(), MlolError> {
        reservation::cancel_by_id(&self.session, &held.id)
    }

    pub fn cancel_reservation_by_id(&self, reservation_id: &str) -> Result<(), MlolError> {
        reservation::cancel_by_id(&self.session, reservation_id)
    }

    /// Cancels whichever reservation this account holds for `book`
    pub fn cancel_book_reservation(&self, book: &Book) -> Result<(), MlolError> {
        reservation::cancel_book_reservation(&self.session, book)
    }

    pub fn book_url(&self, id: &str) -> String {
        book_url(self.session.base_url(), id)
    }
}
