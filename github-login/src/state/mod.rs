//! Application state management
//!
//! Everything handlers share: the configuration, the GitHub provider and the
//! session store. Cloning is cheap.

use std::sync::Arc;
use thiserror::Error;

use crate::config::{AppConfig, ConfigError};
use crate::oauth2::{build_http_client, GitHubProvider, OAuthError};
use crate::session::SessionStore;

/// Errors building the application state
#[derive(Debug, Error)]
pub enum StateError {
    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The outbound HTTP client could not be built
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// A provider endpoint could not be built
    #[error(transparent)]
    Provider(#[from] OAuthError),
}

/// Application state for the login service
#[derive(Clone, Debug)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,

    /// GitHub OAuth2 provider
    pub provider: GitHubProvider,

    /// Login sessions
    pub sessions: SessionStore,
}

impl AppState {
    /// Assemble state from already built parts
    #[must_use]
    pub fn new(config: AppConfig, provider: GitHubProvider, sessions: SessionStore) -> Self {
        Self {
            config: Arc::new(config),
            provider,
            sessions,
        }
    }

    /// Validate `config` and build the provider and session store from it
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if the configuration is invalid or the HTTP
    /// client cannot be created
    pub fn from_config(config: AppConfig) -> Result<Self, StateError> {
        let credentials = config.validate()?;
        let http = build_http_client(&config.github)?;
        let provider = GitHubProvider::from_settings(&config.github, credentials, http)?;
        let sessions = SessionStore::new(config.session.ttl());

        Ok(Self::new(config, provider, sessions))
    }
}
