//! Configuration management for github-login
//!
//! Configuration is loaded from multiple sources with clear precedence:
//!
//! 1. `CLIENT_ID` / `CLIENT_SECRET` environment variables (highest priority)
//! 2. Environment variables with the `GITHUB_LOGIN_` prefix, `__` for nesting
//! 3. The TOML file passed with `--config`, or `./github-login.toml`
//! 4. Hardcoded defaults (fallback)
//!
//! Environment variable format: `GITHUB_LOGIN_SECTION__FIELD_NAME`
//! - Example: `GITHUB_LOGIN_GITHUB__FETCH_ORGANIZATIONS=false`
//!
//! # Example Configuration
//!
//! ```toml
//! # github-login.toml
//! [server]
//! bind = "127.0.0.1:3000"
//!
//! [github]
//! client_id = "your-github-client-id"
//! client_secret = "your-github-client-secret"
//! callback_url = "http://localhost:3000/login/github/callback"
//! scopes = ["user", "read:org"]
//! fetch_organizations = true
//!
//! [session]
//! ttl_secs = 600
//! ```
//!
//! Loading never fails because the client credentials are missing; that check
//! is [`AppConfig::validate`], which the binary runs before binding the
//! listener.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::oauth2::types::ClientCredentials;

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "github-login.toml";

/// Environment variable prefix for nested settings
pub const ENV_PREFIX: &str = "GITHUB_LOGIN_";

/// Longest accepted `session.ttl_secs` (one week)
pub const MAX_SESSION_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Configuration errors
///
/// All of these are fatal at startup and never occur per request.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required setting is absent or empty
    #[error("missing required setting `{key}` (set {hint})")]
    Missing {
        /// Dotted setting name
        key: &'static str,
        /// Where the operator can provide it
        hint: &'static str,
    },

    /// A URL setting does not parse
    #[error("invalid URL in `{key}`: {source}")]
    InvalidUrl {
        /// Dotted setting name
        key: &'static str,
        /// Parse failure
        source: url::ParseError,
    },

    /// A numeric setting is out of range
    #[error("`{key}` must be greater than zero")]
    ZeroDuration {
        /// Dotted setting name
        key: &'static str,
    },

    /// A numeric setting exceeds its upper bound
    #[error("`{key}` must be at most {max}")]
    TooLarge {
        /// Dotted setting name
        key: &'static str,
        /// Largest accepted value
        max: u64,
    },

    /// An explicitly requested config file does not exist
    #[error("config file {} does not exist", .0.display())]
    FileNotFound(PathBuf),

    /// The layered sources could not be merged or extracted
    #[error("failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    /// The defaults could not be rendered as TOML
    #[error("failed to serialize default configuration: {0}")]
    Defaults(#[from] toml::ser::Error),
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Address the listener binds to
    pub bind: SocketAddr,

    /// Upper bound on handling a single inbound request, in seconds
    pub request_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            request_timeout_secs: 30,
        }
    }
}

impl ServerSettings {
    /// Inbound request timeout
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// GitHub OAuth application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubSettings {
    /// OAuth application client ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// OAuth application client secret
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Callback URL registered with the OAuth application
    pub callback_url: String,

    /// Scopes requested on the consent screen
    pub scopes: Vec<String>,

    /// Whether the callback also retrieves organization memberships
    pub fetch_organizations: bool,

    /// Base URL of the consent and token endpoints
    pub authorize_base_url: String,

    /// Base URL of the REST API
    pub api_base_url: String,

    /// Timeout for each outbound call, in seconds
    pub request_timeout_secs: u64,

    /// Timeout for establishing outbound connections, in seconds
    pub connect_timeout_secs: u64,

    /// `User-Agent` sent to the API (GitHub rejects requests without one)
    pub user_agent: String,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            callback_url: "http://localhost:3000/login/github/callback".to_string(),
            scopes: vec!["user".to_string(), "read:org".to_string()],
            fetch_organizations: true,
            authorize_base_url: "https://github.com".to_string(),
            api_base_url: "https://api.github.com".to_string(),
            request_timeout_secs: 10,
            connect_timeout_secs: 5,
            user_agent: concat!("github-login/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl GitHubSettings {
    /// Outbound request timeout
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Outbound connect timeout
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Client credentials, if both halves are present and non-empty
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] naming the absent half
    pub fn credentials(&self) -> Result<ClientCredentials, ConfigError> {
        let client_id = non_empty(self.client_id.as_deref()).ok_or(ConfigError::Missing {
            key: "github.client_id",
            hint: "CLIENT_ID or GITHUB_LOGIN_GITHUB__CLIENT_ID",
        })?;
        let client_secret =
            non_empty(self.client_secret.as_deref()).ok_or(ConfigError::Missing {
                key: "github.client_secret",
                hint: "CLIENT_SECRET or GITHUB_LOGIN_GITHUB__CLIENT_SECRET",
            })?;

        Ok(ClientCredentials::new(client_id, client_secret))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Server-side login session settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Name of the session cookie
    pub cookie_name: String,

    /// Lifetime of a session entry and its cookie, in seconds
    pub ttl_secs: u64,

    /// Add the `Secure` attribute to the cookie (HTTPS only)
    pub secure_cookies: bool,

    /// Interval between sweeps of expired sessions, in seconds
    pub purge_interval_secs: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            cookie_name: "github_login_session".to_string(),
            ttl_secs: 600,
            secure_cookies: !cfg!(debug_assertions),
            purge_interval_secs: 60,
        }
    }
}

impl SessionSettings {
    /// Session lifetime
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// How often expired sessions are dropped
    #[must_use]
    pub const fn purge_interval(&self) -> Duration {
        Duration::from_secs(self.purge_interval_secs)
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Listener settings
    #[serde(default)]
    pub server: ServerSettings,

    /// OAuth application settings
    #[serde(default)]
    pub github: GitHubSettings,

    /// Session settings
    #[serde(default)]
    pub session: SessionSettings,
}

impl AppConfig {
    /// Load configuration from defaults, a TOML file and the environment
    ///
    /// When `path` is `None`, `./github-login.toml` is used if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Default configuration cannot be serialized to TOML
    /// - An explicitly given file does not exist or is not valid TOML
    /// - Values fail type conversion
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Toml::string(&toml::to_string(&Self::default())?));

        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::FileNotFound(path.to_path_buf()));
                }
                figment = figment.merge(Toml::file(path));
            }
            None => {
                let local_config = PathBuf::from(DEFAULT_CONFIG_FILE);
                if local_config.exists() {
                    figment = figment.merge(Toml::file(local_config));
                }
            }
        }

        Self::extract(figment)
    }

    /// Apply the environment layers on top of `figment` and extract
    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__").lowercase(true))
            .merge(
                Env::raw()
                    .only(&["CLIENT_ID", "CLIENT_SECRET"])
                    .map(|key| format!("github.{}", key.as_str().to_lowercase()).into()),
            )
            .extract()
            .map_err(|e| ConfigError::Load(Box::new(e)))
    }

    /// Check everything the flow needs before any request is accepted
    ///
    /// # Errors
    ///
    /// Returns the first problem found: missing credentials, an unparsable
    /// URL, a zero timeout or an oversized session lifetime
    pub fn validate(&self) -> Result<ClientCredentials, ConfigError> {
        let credentials = self.github.credentials()?;

        for (key, value) in [
            ("github.callback_url", &self.github.callback_url),
            ("github.authorize_base_url", &self.github.authorize_base_url),
            ("github.api_base_url", &self.github.api_base_url),
        ] {
            Url::parse(value).map_err(|source| ConfigError::InvalidUrl { key, source })?;
        }

        for (key, value) in [
            ("github.request_timeout_secs", self.github.request_timeout_secs),
            ("github.connect_timeout_secs", self.github.connect_timeout_secs),
            ("server.request_timeout_secs", self.server.request_timeout_secs),
            ("session.ttl_secs", self.session.ttl_secs),
            ("session.purge_interval_secs", self.session.purge_interval_secs),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroDuration { key });
            }
        }

        if self.session.ttl_secs > MAX_SESSION_TTL_SECS {
            return Err(ConfigError::TooLarge {
                key: "session.ttl_secs",
                max: MAX_SESSION_TTL_SECS,
            });
        }

        Ok(credentials)
    }
}
