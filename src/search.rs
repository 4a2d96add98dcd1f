//! Paginated catalog search
//!
//! [`SearchPages`] pulls one results page per call to `next`, so nothing is
//! requested until the caller asks for it. A finished search cannot be
//! rewound; run the query again to start over from page one.
use crate::book::Page;
use crate::detail::enrich;
use crate::errors::MlolError;
use crate::extraction::{parse_page_count, parse_search_page};
use crate::networking::{Fetch, PageRequest, SEARCH_ENDPOINT};
use log::debug;

/// Results requested per page
pub const PAGE_SIZE: u32 = 48;
/// Catalog section searched: ebooks
const SEARCH_TYPE: &str = "310";
/// Window used by the "latest additions" listing
const LATEST_WINDOW: &str = "15day";

#[derive(Debug, Clone, PartialEq, Eq)]
enum QueryKind {
    Keywords(String),
    Latest,
}

/// What to list and whether to enrich every record with its detail page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    kind: QueryKind,
    pub deep: bool,
}

impl SearchQuery {
    /// Free-text search; an empty term lists the whole catalog
    pub fn new(term: &str, deep: bool) -> Self {
        SearchQuery {
            kind: QueryKind::Keywords(term.trim().to_string()),
            deep,
        }
    }

    /// Titles added over the last fifteen days
    pub fn latest(deep: bool) -> Self {
        SearchQuery {
            kind: QueryKind::Latest,
            deep,
        }
    }

    /// Request for results page `page` (1-based)
    ///
    /// The first page is requested without a page number, as the portal's
    /// own search form does.
    pub fn request(&self, page: u32) -> PageRequest {
        let request = PageRequest::new(SEARCH_ENDPOINT).query("seltip", SEARCH_TYPE);
        let request = match &self.kind {
            QueryKind::Keywords(term) => request.query("keywords", term.as_str()),
            QueryKind::Latest => request.query("news", LATEST_WINDOW),
        };
        let request = request.query("nris", PAGE_SIZE.to_string());
        if page > 1 {
            request.query("page", page.to_string())
        } else {
            request
        }
    }
}

/// Where a [`SearchPages`] stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchState {
    NotStarted,
    /// A page request is in flight
    Fetching { page: u32 },
    /// Page `next_page - 1` was yielded
    HasPage { next_page: u32, total_pages: u32 },
    Exhausted,
    /// Terminal; every further advance returns this error again
    Errored { page: u32, reason: String },
}

/// Lazy sequence of result pages
///
/// Yields `Ok(page)` for every non-empty page in server order and stops at
/// the first empty page or past the last page announced by the pager. A
/// query with no matches yields nothing at all. After a failure the same
/// [`MlolError::Search`] is returned on every call, so stop at the first
/// `Err` (as `collect::<Result<Vec<_>, _>>()` does).
pub struct SearchPages<'a, F: Fetch + ?Sized> {
    fetcher: &'a F,
    query: SearchQuery,
    state: SearchState,
}

impl<'a, F: Fetch + ?Sized> SearchPages<'a, F> {
    pub fn new(fetcher: &'a F, query: SearchQuery) -> Self {
        SearchPages {
            fetcher,
            query,
            state: SearchState::NotStarted,
        }
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    pub fn query(&self) -> &SearchQuery {
        &self.query
    }

    /// Fetches and parses page `page`; `total_pages` is known from page two on
    fn fetch_page(&self, page: u32, total_pages: Option<u32>) -> Result<(Page, u32), MlolError> {
        let fetched = self.fetcher.fetch(&self.query.request(page))?;
        if !fetched.is_success() {
            return Err(MlolError::Search {
                page,
                reason: format!("HTTP {} fetching {}", fetched.status, fetched.url),
            });
        }

        let html = fetched.text();
        let books = parse_search_page(&html)?;
        let total_pages = match total_pages {
            Some(total) => total,
            None => parse_page_count(&html)?,
        };
        debug!(
            "Page {page}/{total_pages} holds {} records",
            books.len()
        );

        if !self.query.deep {
            return Ok((books, total_pages));
        }
        let books = books
            .into_iter()
            .map(|book| enrich(self.fetcher, book))
            .collect::<Result<Page, MlolError>>()?;
        Ok((books, total_pages))
    }
}

impl<F: Fetch + ?Sized> Iterator for SearchPages<'_, F> {
    type Item = Result<Page, MlolError>;

    fn next(&mut self) -> Option<Self::Item> {
        let (page, known_total) = match self.state.clone() {
            SearchState::NotStarted => (1, None),
            SearchState::HasPage {
                next_page,
                total_pages,
            } => {
                if next_page > total_pages {
                    self.state = SearchState::Exhausted;
                    return None;
                }
                (next_page, Some(total_pages))
            }
            SearchState::Errored { page, reason } => {
                return Some(Err(MlolError::Search { page, reason }));
            }
            // only left behind if a fetch panicked
            SearchState::Fetching { .. } | SearchState::Exhausted => return None,
        };

        self.state = SearchState::Fetching { page };
        match self.fetch_page(page, known_total) {
            Ok((books, _)) if books.is_empty() => {
                self.state = SearchState::Exhausted;
                None
            }
            Ok((books, total_pages)) => {
                self.state = SearchState::HasPage {
                    next_page: page + 1,
                    total_pages,
                };
                Some(Ok(books))
            }
            Err(err) => {
                let err = err.into_search(page);
                if let MlolError::Search { page, reason } = &err {
                    self.state = SearchState::Errored {
                        page: *page,
                        reason: reason.clone(),
                    };
                }
                Some(Err(err))
            }
        }
    }
}
