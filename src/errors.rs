use thiserror::Error;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, MlolError>;

#[derive(Error, Debug)]
pub enum MlolError {
    /// The portal rejected the supplied credentials
    #[error("authentication failed for {username}: {reason}")]
    Authentication { username: String, reason: String },
    /// A results page could not be fetched or parsed
    #[error("search failed on page {page}: {reason}")]
    Search { page: u32, reason: String },
    /// No supported format, no lending rights, or the transfer itself failed
    #[error("download of book {id} failed: {reason}")]
    Download { id: String, reason: String },
    /// Reserving, cancelling or listing reservations failed
    #[error("reservation request for {target} failed: {reason}")]
    Reservation { target: String, reason: String },
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP {status} fetching {url}")]
    Status { url: String, status: u16 },
    #[error("parse error: {0}")]
    Parse(String),
    #[error("Selector error: {0}")]
    SelectorError(String),
    #[error("regex error: {0}")]
    RegexError(String),
}

impl MlolError {
    /// Collapses any failure raised while producing a results page into a search error
    pub(crate) fn into_search(self, page: u32) -> MlolError {
        match self {
            err @ MlolError::Search { .. } => err,
            other => MlolError::Search {
                page,
                reason: other.to_string(),
            },
        }
    }

    pub(crate) fn into_reservation(self, target: &str) -> MlolError {
        match self {
            err @ MlolError::Reservation { .. } => err,
            other => MlolError::Reservation {
                target: target.to_string(),
                reason: other.to_string(),
            },
        }
    }

    pub(crate) fn into_download(self, id: &str) -> MlolError {
        match self {
            err @ MlolError::Download { .. } => err,
            other => MlolError::Download {
                id: id.to_string(),
                reason: other.to_string(),
            },
        }
    }
}
