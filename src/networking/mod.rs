//! # networking
//!
//! HTTP plumbing for the MLOL web portal.
//!
//! This module provides:
//! - HTTP client configuration with cookie support and browser-like headers
//! - The [`Session`] capability, anonymous or bound to one account
//! - Form-based portal login with library discovery
//! - The [`Fetch`] seam the search, detail and download flows are written against
//!
//! ## Usage
//!
//! ```no_run
//! use mlol_client::networking::{Fetch, PageRequest, Session};
//! use mlol_client::ClientConfig;
//!
//! let session = Session::open(&ClientConfig::default()).expect("Failed to create session");
//! let page = session
//!     .fetch(&PageRequest::new("/media/scheda.aspx").query("id", "150208516"))
//!     .expect("Failed to fetch page");
//! println!("{}", page.status);
//! ```
//!
//! A [`Session`] is meant to be driven from one thread at a time; no locking
//! is done around the cookie state it carries.

// Module declarations
pub mod auth;
pub mod client;

use crate::errors::MlolError;
use reqwest::Url;
use std::borrow::Cow;

// Re-export commonly used items for convenience
pub use auth::LoginInfo;
pub use auth::blocking::login;
pub use client::blocking::{Session, create_client};

/// Portal landing page, carries the library picker used at login
pub const INDEX_ENDPOINT: &str = "/home/index.aspx";
pub const LOGIN_ENDPOINT: &str = "/user/login.aspx";
pub const LOGIN_FORM_ENDPOINT: &str = "/user/logform.aspx";
/// Where a successful login redirects to
pub const LOGIN_SUCCESS_LOCATION: &str = "/media/esplora.aspx";
pub const SEARCH_ENDPOINT: &str = "/media/ricerca.aspx";
pub const BOOK_ENDPOINT: &str = "/media/scheda.aspx";
pub const DOWNLOAD_ENDPOINT: &str = "/media/downloadebadok.aspx";
pub const DOWNLOAD_REFERER_ENDPOINT: &str = "/media/downloadebad2.aspx";
/// Account page listing loans and reservations
pub const RESOURCES_ENDPOINT: &str = "/user/risorse.aspx";
pub const PRE_RESERVE_ENDPOINT: &str = "/media/prenota.aspx";
pub const RESERVE_ENDPOINT: &str = "/media/prenota2.aspx";
pub const CANCEL_RESERVATION_ENDPOINT: &str = "/media/annullaPr.aspx";
pub const QUEUE_POSITION_ENDPOINT: &str = "/commons/QueuePos.aspx";
/// Detail requests for items outside the user's library land here
pub const ALERT_PAGE: &str = "alert.aspx";

/// One GET request against the portal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// A path relative to the portal root, or an absolute URL
    pub target: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl PageRequest {
    pub fn new(target: impl Into<String>) -> Self {
        PageRequest {
            target: target.into(),
            query: Vec::new(),
            headers: Vec::new(),
        }
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Builds the full URL against `base_url`
    pub fn resolve(&self, base_url: &str) -> Result<Url, MlolError> {
        let base = Url::parse(base_url)
            .map_err(|e| MlolError::Parse(format!("invalid base url {base_url}: {e}")))?;
        let mut url = base
            .join(&self.target)
            .map_err(|e| MlolError::Parse(format!("invalid target {}: {e}", self.target)))?;
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(self.query.iter());
        }
        Ok(url)
    }
}

/// A response once redirects have been followed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    /// Final URL after redirects
    pub url: String,
    pub status: u16,
    pub body: Vec<u8>,
}

impl Fetched {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// The request capability shared by both session kinds
pub trait Fetch {
    /// Portal root every relative request is resolved against
    fn base_url(&self) -> &str;

    fn is_authenticated(&self) -> bool;

    /// Issues one GET, following redirects
    fn fetch(&self, request: &PageRequest) -> Result<Fetched, MlolError>;
}
