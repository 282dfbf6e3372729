//! GitHub provider
//!
//! Composes the three flow steps for one OAuth application.

use std::sync::Arc;
use url::Url;

use super::profile::ProfileFetcher;
use super::redirect::{AuthorizationRedirector, StateToken};
use super::token::TokenExchanger;
use super::types::{AuthorizationCode, ClientCredentials, ExchangeResult, OAuthError};
use crate::config::GitHubSettings;

/// GitHub OAuth2 provider
#[derive(Clone)]
pub struct GitHubProvider {
    redirector: Arc<AuthorizationRedirector>,
    exchanger: TokenExchanger,
    fetcher: ProfileFetcher,
    fetch_organizations: bool,
}

impl std::fmt::Debug for GitHubProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubProvider")
            .field("fetch_organizations", &self.fetch_organizations)
            .finish_non_exhaustive()
    }
}

impl GitHubProvider {
    /// Create a provider from settings and validated credentials
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::InvalidEndpoint`] if any configured URL is invalid
    pub fn from_settings(
        settings: &GitHubSettings,
        credentials: ClientCredentials,
        http: reqwest::Client,
    ) -> Result<Self, OAuthError> {
        let redirector = AuthorizationRedirector::new(
            &settings.authorize_base_url,
            credentials.client_id(),
            &settings.callback_url,
            &settings.scopes,
        )?;
        let exchanger = TokenExchanger::new(
            http.clone(),
            &settings.authorize_base_url,
            Arc::new(credentials),
        )?;
        let fetcher = ProfileFetcher::new(http, &settings.api_base_url)?;

        Ok(Self {
            redirector: Arc::new(redirector),
            exchanger,
            fetcher,
            fetch_organizations: settings.fetch_organizations,
        })
    }

    /// Consent URL for a new flow protected by `state`
    #[must_use]
    pub fn authorization_url(&self, state: &StateToken) -> Url {
        self.redirector.authorization_url(state)
    }

    /// Whether organization memberships are retrieved
    #[must_use]
    pub const fn fetches_organizations(&self) -> bool {
        self.fetch_organizations
    }

    /// Run the server-side half of the flow for `code`
    ///
    /// Exchanges the code, then fetches the profile (and organizations, when
    /// enabled). The access token is dropped before this returns.
    ///
    /// # Errors
    ///
    /// Returns the first [`OAuthError`] raised by the exchange or a fetch
    pub async fn complete_login(
        &self,
        code: &AuthorizationCode,
    ) -> Result<ExchangeResult, OAuthError> {
        let token = self.exchanger.exchange_code(code).await?;
        self.fetcher
            .fetch_all(&token, self.fetch_organizations)
            .await
    }
}
