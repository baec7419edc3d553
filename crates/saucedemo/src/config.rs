// Suite configuration
//
// Where the store lives and who logs in. Every value has a default that
// targets the public demo store; the environment overrides them.

use thiserror::Error;
use url::Url;

/// Store root the suite runs against.
pub const BASE_URL_ENV: &str = "SAUCEDEMO_BASE_URL";
pub const USERNAME_ENV: &str = "SAUCEDEMO_USERNAME";
pub const PASSWORD_ENV: &str = "SAUCEDEMO_PASSWORD";

pub const DEFAULT_BASE_URL: &str = "https://www.saucedemo.com/";
pub const DEFAULT_USERNAME: &str = "standard_user";
pub const DEFAULT_PASSWORD: &str = "secret_sauce";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid base URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Base URL '{0}' must use http or https")]
    UnsupportedScheme(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteConfig {
    base_url: String,
    username: String,
    password: String,
}

impl SuiteConfig {
    /// Configuration for the store at `base_url`, with the default
    /// credentials.
    ///
    /// The base URL always ends with `/` so that page paths join below it.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let mut url = Url::parse(base_url).map_err(|source| ConfigError::InvalidBaseUrl {
            url: base_url.to_string(),
            source,
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(base_url.to_string()));
        }
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        Ok(Self {
            base_url: url.into(),
            username: DEFAULT_USERNAME.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
        })
    }

    /// Reads `SAUCEDEMO_BASE_URL`, `SAUCEDEMO_USERNAME` and
    /// `SAUCEDEMO_PASSWORD`, falling back to the defaults for unset ones.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = std::env::var(BASE_URL_ENV).unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let mut config = Self::new(&base_url)?;
        if let Ok(username) = std::env::var(USERNAME_ENV) {
            config.username = username;
        }
        if let Ok(password) = std::env::var(PASSWORD_ENV) {
            config.password = password;
        }
        tracing::debug!("Suite targets {} as {}", config.base_url, config.username);
        Ok(config)
    }

    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Absolute URL of a page below the store root, e.g. `cart.html`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            username: DEFAULT_USERNAME.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
        }
    }
}
