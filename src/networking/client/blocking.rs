//! Blocking HTTP client implementation for MLOL

use crate::config::ClientConfig;
use crate::errors::MlolError;
use crate::networking::auth::blocking::login;
use crate::networking::{Fetch, Fetched, PageRequest};
use log::{debug, warn};
use reqwest::blocking::Client;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Url, redirect};
use std::sync::Arc;

/// Redirect hops followed before a request is given up on
const MAX_REDIRECTS: usize = 5;

/// Cookie the portal sets once a login succeeded
pub const AUTH_COOKIE: &str = ".ASPXAUTH";

const SEC_FETCH_SITE: &str = "sec-fetch-site";

fn default_web_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.9",
        ),
    );
    headers.insert(SEC_FETCH_SITE, HeaderValue::from_static("same-origin"));
    headers.insert(
        HeaderName::from_static("sec-fetch-mode"),
        HeaderValue::from_static("navigate"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-user"),
        HeaderValue::from_static("?1"),
    );
    headers.insert(
        HeaderName::from_static("sec-fetch-dest"),
        HeaderValue::from_static("document"),
    );
    headers
}

/// Create a configured HTTP client for MLOL operations
///
/// Redirects are never followed automatically: login inspects the redirect
/// target and [`Session::fetch`] follows the rest by hand.
///
/// # Arguments
/// * `config` - user agent and timeout come from here
/// * `jar` - cookie jar to share; a private store is used when `None`
///
/// # Example
/// ```no_run
/// use mlol_client::ClientConfig;
/// use mlol_client::networking::create_client;
/// let client = create_client(&ClientConfig::default(), None).expect("Failed to create client");
/// ```
pub fn create_client(config: &ClientConfig, jar: Option<Arc<Jar>>) -> Result<Client, reqwest::Error> {
    let builder = Client::builder()
        .redirect(redirect::Policy::none())
        .default_headers(default_web_headers())
        .timeout(config.timeout)
        .user_agent(config.user_agent.as_str());
    let builder = match jar {
        Some(jar) => builder.cookie_provider(jar),
        None => builder.cookie_store(true),
    };
    builder.build()
}

/// Transport state of one client instance
///
/// Both variants fetch the same way; only `Authenticated` may download.
/// Not meant for concurrent use from several threads.
#[derive(Debug)]
pub enum Session {
    /// Public catalog access only
    Anonymous { client: Client, base_url: String },
    /// Bound to one account through the portal's session cookies
    Authenticated {
        client: Client,
        base_url: String,
        cookies: Arc<Jar>,
        username: String,
        library_id: String,
    },
}

impl Session {
    /// Opens a session, logging in when the config carries credentials
    ///
    /// One network round trip (more while the library is being discovered)
    /// happens here when logging in.
    pub fn open(config: &ClientConfig) -> Result<Session, MlolError> {
        let Some(info) = &config.login else {
            return Session::anonymous(config);
        };

        let base_url = config.base_url();
        let cookies = Arc::new(Jar::default());
        let client = create_client(config, Some(cookies.clone()))?;
        let library_id = login(&client, &base_url, info, config.library_id.as_deref())?;

        Ok(Session::Authenticated {
            client,
            base_url,
            cookies,
            username: info.username.to_string(),
            library_id,
        })
    }

    pub fn anonymous(config: &ClientConfig) -> Result<Session, MlolError> {
        warn!(
            "No credentials provided. You will not be able to perform actions that require authentication."
        );
        Ok(Session::Anonymous {
            client: create_client(config, None)?,
            base_url: config.base_url(),
        })
    }

    fn client(&self) -> &Client {
        match self {
            Session::Anonymous { client, .. } | Session::Authenticated { client, .. } => client,
        }
    }

    pub fn username(&self) -> Option<&str> {
        match self {
            Session::Anonymous { .. } => None,
            Session::Authenticated { username, .. } => Some(username),
        }
    }

    pub fn library_id(&self) -> Option<&str> {
        match self {
            Session::Anonymous { .. } => None,
            Session::Authenticated { library_id, .. } => Some(library_id),
        }
    }

    /// The `Cookie` header the session would send to the portal root
    pub fn cookie_header(&self) -> Option<String> {
        let Session::Authenticated { cookies, base_url, .. } = self else {
            return None;
        };
        let url = Url::parse(base_url).ok()?;
        cookies
            .cookies(&url)
            .and_then(|value| value.to_str().ok().map(str::to_string))
    }

    /// Whether the portal's auth cookie is currently held
    pub fn has_auth_cookie(&self) -> bool {
        self.cookie_header()
            .is_some_and(|cookies| cookies.contains(&format!("{AUTH_COOKIE}=")))
    }
}

impl Fetch for Session {
    fn base_url(&self) -> &str {
        match self {
            Session::Anonymous { base_url, .. } | Session::Authenticated { base_url, .. } => {
                base_url
            }
        }
    }

    fn is_authenticated(&self) -> bool {
        matches!(self, Session::Authenticated { .. })
    }

    /// Get the requested page, following redirects by hand
    ///
    /// A hop that leaves the portal's host is marked cross-site, as a browser
    /// would when the portal hands a download over to the content server.
    fn fetch(&self, request: &PageRequest) -> Result<Fetched, MlolError> {
        let mut url = request.resolve(self.base_url())?;
        let portal_host = url.host_str().map(str::to_string);
        let mut last_status = 0;

        for _ in 0..=MAX_REDIRECTS {
            debug!("Did request to {url}");
            let mut builder = self.client().get(url.clone());
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            if url.host_str().map(str::to_string) != portal_host {
                builder = builder.header(SEC_FETCH_SITE, "cross-site");
            }

            let response = builder.send()?;
            let status = response.status();
            debug!("{status}");
            last_status = status.as_u16();

            if status.is_redirection() {
                if let Some(location) = response
                    .headers()
                    .get(header::LOCATION)
                    .and_then(|value| value.to_str().ok())
                {
                    debug!("Following redirect to {location}");
                    url = url.join(location).map_err(|e| {
                        MlolError::Parse(format!("invalid redirect location {location}: {e}"))
                    })?;
                    continue;
                }
            }

            return Ok(Fetched {
                url: response.url().to_string(),
                status: status.as_u16(),
                body: response.bytes()?.to_vec(),
            });
        }

        Err(MlolError::Status {
            url: url.to_string(),
            status: last_status,
        })
    }
}
