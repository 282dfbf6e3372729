//! Authenticated resource retrieval
//!
//! Uses an access token to read the user's profile and organization
//! memberships from the provider's REST API.

use http::header::{ACCEPT, AUTHORIZATION};
use http::StatusCode;
use serde::Deserialize;
use serde_json::value::RawValue;
use url::Url;

use super::types::{
    AccessToken, Endpoint, ExchangeResult, OAuthError, OrganizationList, UserProfile,
};

/// Path of the profile endpoint, relative to the API base URL
pub const USER_PATH: &str = "/user";

/// Path of the organization list endpoint, relative to the API base URL
pub const USER_ORGS_PATH: &str = "/user/orgs";

/// Entry of the organization list; everything but `login` is ignored
#[derive(Debug, Deserialize)]
struct Organization {
    login: String,
}

/// Fetches profile data on behalf of an access token
#[derive(Clone)]
pub struct ProfileFetcher {
    http: reqwest::Client,
    user_url: Url,
    orgs_url: Url,
}

impl ProfileFetcher {
    /// Create a fetcher reading from `api_base_url`
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::InvalidEndpoint`] if the base URL is invalid
    pub fn new(http: reqwest::Client, api_base_url: &str) -> Result<Self, OAuthError> {
        let base = api_base_url.trim_end_matches('/');
        let user_url = Url::parse(&format!("{base}{USER_PATH}")).map_err(|source| {
            OAuthError::InvalidEndpoint {
                endpoint: "user",
                source,
            }
        })?;
        let orgs_url = Url::parse(&format!("{base}{USER_ORGS_PATH}")).map_err(|source| {
            OAuthError::InvalidEndpoint {
                endpoint: "user/orgs",
                source,
            }
        })?;

        Ok(Self {
            http,
            user_url,
            orgs_url,
        })
    }

    /// Fetch the profile document
    ///
    /// The body is returned verbatim; it only has to be valid JSON.
    ///
    /// # Errors
    ///
    /// - [`OAuthError::Unauthorized`] for a blank token (no request is sent)
    ///   or a 401/403 from the provider
    /// - [`OAuthError::Transport`] on network failure or timeout
    /// - [`OAuthError::Decode`] if the body is not JSON
    /// - [`OAuthError::UnexpectedStatus`] for any other non-success status
    pub async fn fetch_profile(&self, token: &AccessToken) -> Result<UserProfile, OAuthError> {
        let body = self.get(Endpoint::User, &self.user_url, token).await?;

        serde_json::from_slice::<Box<RawValue>>(&body)
            .map(UserProfile::new)
            .map_err(|e| OAuthError::decode(Endpoint::User, &e))
    }

    /// Fetch the logins of the user's organizations, in provider order
    ///
    /// # Errors
    ///
    /// Same as [`fetch_profile`](Self::fetch_profile); a body that is not an
    /// array of objects with a `login` string is a [`OAuthError::Decode`],
    /// never an empty list.
    pub async fn fetch_organizations(
        &self,
        token: &AccessToken,
    ) -> Result<OrganizationList, OAuthError> {
        let body = self
            .get(Endpoint::Organizations, &self.orgs_url, token)
            .await?;

        let organizations: Vec<Organization> = serde_json::from_slice(&body)
            .map_err(|e| OAuthError::decode(Endpoint::Organizations, &e))?;

        Ok(organizations.into_iter().map(|org| org.login).collect())
    }

    /// Fetch the profile and, when `include_organizations` is set, the
    /// organizations concurrently
    ///
    /// Nothing is returned unless every requested call succeeds.
    ///
    /// # Errors
    ///
    /// Returns the first error from either call
    pub async fn fetch_all(
        &self,
        token: &AccessToken,
        include_organizations: bool,
    ) -> Result<ExchangeResult, OAuthError> {
        let (profile, organizations) = if include_organizations {
            tokio::try_join!(self.fetch_profile(token), self.fetch_organizations(token))?
        } else {
            (self.fetch_profile(token).await?, OrganizationList::default())
        };

        Ok(ExchangeResult {
            profile,
            organizations,
        })
    }

    async fn get(
        &self,
        endpoint: Endpoint,
        url: &Url,
        token: &AccessToken,
    ) -> Result<Vec<u8>, OAuthError> {
        if token.is_blank() {
            return Err(OAuthError::Unauthorized(format!(
                "no access token for {endpoint}"
            )));
        }

        let response = self
            .http
            .get(url.clone())
            .header(AUTHORIZATION, token.authorization_header())
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(OAuthError::transport(endpoint))?;

        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                tracing::warn!(endpoint = %endpoint, status = %status, "Provider denied resource request");
                Err(OAuthError::Unauthorized(format!(
                    "{endpoint} returned {status}"
                )))
            }
            status if !status.is_success() => {
                Err(OAuthError::UnexpectedStatus { endpoint, status })
            }
            _ => response
                .bytes()
                .await
                .map(|body| body.to_vec())
                .map_err(OAuthError::transport(endpoint)),
        }
    }
}
