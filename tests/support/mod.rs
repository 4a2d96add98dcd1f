//! In-memory stand-in for the portal, shared by the integration tests.
#![allow(dead_code)]

use mlol_client::{Fetch, Fetched, MlolError, PageRequest};
use std::cell::RefCell;
use std::collections::HashMap;

pub const BASE_URL: &str = "https://bologna.medialibrary.it";

pub fn init_logging() {
    let _ = pretty_env_logger::try_init();
}

/// Serves canned responses keyed by `path?query`; anything else is a 404
pub struct FakePortal {
    authenticated: bool,
    routes: HashMap<String, Fetched>,
    requests: RefCell<Vec<PageRequest>>,
}

impl FakePortal {
    pub fn anonymous() -> Self {
        FakePortal {
            authenticated: false,
            routes: HashMap::new(),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn authenticated() -> Self {
        FakePortal {
            authenticated: true,
            ..Self::anonymous()
        }
    }

    pub fn page(self, key: &str, status: u16, body: impl Into<Vec<u8>>) -> Self {
        let url = format!("{BASE_URL}{key}");
        self.landing(key, &url, status, body)
    }

    /// A route whose final URL differs from the requested one (a followed redirect)
    pub fn landing(
        mut self,
        key: &str,
        final_url: &str,
        status: u16,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        self.routes.insert(
            key.to_string(),
            Fetched {
                url: final_url.to_string(),
                status,
                body: body.into(),
            },
        );
        self
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.borrow().clone()
    }

    /// `path?query` of every request, in order
    pub fn requested_keys(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| route_key(r).expect("request should resolve"))
            .collect()
    }
}

fn route_key(request: &PageRequest) -> Result<String, MlolError> {
    let url = request.resolve(BASE_URL)?;
    Ok(match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    })
}

impl Fetch for FakePortal {
    fn base_url(&self) -> &str {
        BASE_URL
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    fn fetch(&self, request: &PageRequest) -> Result<Fetched, MlolError> {
        self.requests.borrow_mut().push(request.clone());
        let key = route_key(request)?;
        Ok(self.routes.get(&key).cloned().unwrap_or_else(|| Fetched {
            url: format!("{BASE_URL}{key}"),
            status: 404,
            body: b"<html><body>Not found</body></html>".to_vec(),
        }))
    }
}

/// Route key of results page `page` for `term`
pub fn search_key(term: &str, page: u32) -> String {
    let mut key = format!("/media/ricerca.aspx?seltip=310&keywords={term}&nris=48");
    if page > 1 {
        key.push_str(&format!("&page={page}"));
    }
    key
}

pub fn book_key(id: &str) -> String {
    format!("/media/scheda.aspx?id={id}")
}

pub fn download_key(id: &str, format: &str) -> String {
    format!("/media/downloadebadok.aspx?unid={id}&form={format}")
}

/// A results page holding `(id, title, author)` items, with an optional pager
pub fn results_page(items: &[(&str, &str, &str)], pages: Option<u32>) -> String {
    let mut html = String::from("<html><body><div id=\"search-results\">");
    for (id, title, author) in items {
        html.push_str(&format!(
            "<div class=\"result-item\"><a href=\"/media/scheda.aspx?id={id}\"><h4 title=\"{title}\">{title}</h4></a><p><a class=\"authorref\">{author}</a></p></div>"
        ));
    }
    html.push_str("</div>");
    if let Some(pages) = pages {
        html.push_str(&format!("<div id=\"pager\" data-pages=\"{pages}\"></div>"));
    }
    html.push_str("</body></html>");
    html
}

/// A detail page with the fields the parser reads
pub fn book_page(title: &str, author: &str, status: &str, formats: &str) -> String {
    format!(
        r##"<html><body>
<h1 class="book-title">{title}</h1>
<h3 class="authors_title">{author}</h3>
<h3 class="publisher_title"><span><a href="#">Adelphi</a></span></h3>
<div class="panel-mlol">{status}</div>
<div itemprop="description"><p>Descrizione di {title}.</p></div>
<div><div><b>ANNO</b></div><span itemprop="datePublished">2012</span></div>
<div><div><b>LINGUA</b></div><span itemprop="inLanguage">italiano</span></div>
<div><div><b>ISBN</b></div><span itemprop="isbn">9788845927256</span></div>
<div><div><b>FORMATO</b></div><span>{formats}</span></div>
</body></html>"##
    )
}
