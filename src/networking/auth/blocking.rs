//! Blocking authentication implementation for MLOL
use crate::errors::MlolError;
use crate::extraction::parse_library_ids;
use crate::networking::{
    INDEX_ENDPOINT, LOGIN_ENDPOINT, LOGIN_FORM_ENDPOINT, LOGIN_SUCCESS_LOCATION, LoginInfo,
};
use log::{debug, error, info};
use reqwest::blocking::Client;
use reqwest::header::{LOCATION, ORIGIN, REFERER};

fn rejected(info: &LoginInfo, reason: impl Into<String>) -> MlolError {
    MlolError::Authentication {
        username: info.username.to_string(),
        reason: reason.into(),
    }
}

/// Get the library ids offered by the portal's login picker
///
/// # Arguments
/// * `client` - reqwest Client being used
/// * `base_url` - portal root, e.g. `https://bologna.medialibrary.it`
///
/// # Returns
/// * The `lente` option values in page order
pub fn discover_library_ids(client: &Client, base_url: &str) -> Result<Vec<String>, MlolError> {
    let url = format!("{base_url}{INDEX_ENDPOINT}");
    debug!("Did request to {url}");
    let response = client.get(&url).send()?;
    if !response.status().is_success() {
        return Err(MlolError::Status {
            url,
            status: response.status().as_u16(),
        });
    }
    parse_library_ids(&response.text()?)
}

/// How the portal answered one login attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoginOutcome {
    Accepted,
    /// Redirected anywhere but the explore page, usually back to the form
    Rejected,
    /// Not a redirect at all
    Failed(u16),
}

impl LoginOutcome {
    fn reason(self) -> String {
        match self {
            LoginOutcome::Accepted => "login accepted".to_string(),
            LoginOutcome::Rejected => "credentials rejected by the portal".to_string(),
            LoginOutcome::Failed(status) => format!("login request answered HTTP {status}"),
        }
    }
}

/// Posts the login form once for a given library
///
/// The portal answers a good login with a redirect to the explore page and
/// a bad one with a redirect elsewhere, so redirects must not be followed here.
fn submit_login(
    client: &Client,
    base_url: &str,
    info: &LoginInfo,
    library_id: &str,
) -> Result<LoginOutcome, MlolError> {
    let url = format!("{base_url}{LOGIN_ENDPOINT}");
    debug!("Did request to {url} (library {library_id})");
    let response = client
        .post(&url)
        .header(ORIGIN, base_url)
        .header(REFERER, format!("{base_url}{LOGIN_FORM_ENDPOINT}"))
        .form(&[
            ("lusername", &*info.username),
            ("lpassword", &*info.password),
            ("lente", library_id),
        ])
        .send()?;

    let status = response.status();
    let location = response
        .headers()
        .get(LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    debug!("Login answered {status}, location {location:?}");

    Ok(if !status.is_redirection() {
        LoginOutcome::Failed(status.as_u16())
    } else if location.ends_with(LOGIN_SUCCESS_LOCATION) {
        LoginOutcome::Accepted
    } else {
        LoginOutcome::Rejected
    })
}

/// Login to MLOL, keeping the session cookies in `client`
///
/// # Arguments
/// * `client` - reqwest Client with cookie store enabled and redirects disabled
/// * `base_url` - portal root
/// * `info` - credentials
/// * `library_id` - library to log into; when `None` every library listed on
///   the portal's landing page is tried in order
///
/// # Returns
/// * The library id the credentials were accepted for
///
/// # Example
/// ```no_run
/// use mlol_client::ClientConfig;
/// use mlol_client::networking::{LoginInfo, create_client, login};
/// let config = ClientConfig::new().with_domain("bologna.medialibrary.it");
/// let client = create_client(&config, None).unwrap();
/// let info = LoginInfo::new("user", "secret");
/// let library = login(&client, &config.base_url(), &info, None);
/// ```
pub fn login(
    client: &Client,
    base_url: &str,
    info: &LoginInfo,
    library_id: Option<&str>,
) -> Result<String, MlolError> {
    let candidates = match library_id {
        Some(id) => vec![id.to_string()],
        None => discover_library_ids(client, base_url)
            .map_err(|e| rejected(info, format!("could not list libraries: {e}")))?,
    };
    if candidates.is_empty() {
        error!("Login failed: {base_url} lists no library to log into");
        return Err(rejected(info, "portal lists no library to log into"));
    }

    let mut outcome = LoginOutcome::Rejected;
    for candidate in candidates {
        outcome = submit_login(client, base_url, info, &candidate)
            .map_err(|e| rejected(info, e.to_string()))?;
        if outcome == LoginOutcome::Accepted {
            info!(
                "Logged in as {} on {base_url} (library {candidate})",
                info.username
            );
            return Ok(candidate);
        }
    }

    error!("Login failed. Please make sure your credentials are valid.");
    Err(rejected(info, outcome.reason()))
}
