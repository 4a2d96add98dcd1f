//! Construction-time configuration for [`crate::MlolClient`]

use crate::networking::LoginInfo;
use std::time::Duration;

/// Public catalog host, used when no library subdomain is given
pub const DEFAULT_DOMAIN: &str = "https://medialibrary.it";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/87.0.4280.67 Safari/537.36";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Client settings
///
/// Everything is passed explicitly; nothing is read from the environment.
///
/// # Example
/// ```
/// use mlol_client::ClientConfig;
/// let config = ClientConfig::new()
///     .with_domain("bologna.medialibrary.it/")
///     .with_credentials("user", "secret");
/// assert_eq!(config.base_url(), "https://bologna.medialibrary.it");
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub domain: String,
    pub login: Option<LoginInfo>,
    /// Library (`lente`) to log into; discovered from the portal when absent
    pub library_id: Option<String>,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            domain: DEFAULT_DOMAIN.to_string(),
            login: None,
            library_id: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.login = Some(LoginInfo::new(username, password));
        self
    }

    pub fn with_library_id(mut self, library_id: impl Into<String>) -> Self {
        self.library_id = Some(library_id.into());
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The portal root: trailing slashes removed, `https://` added to bare hosts
    pub fn base_url(&self) -> String {
        let domain = self.domain.trim().trim_end_matches('/');
        if domain.starts_with("https://") || domain.starts_with("http://") {
            domain.to_string()
        } else {
            format!("https://{domain}")
        }
    }
}
