//! Authorization code exchange
//!
//! Trades the one-time code from the callback for an access token with a
//! server-to-server `POST` to the provider's token endpoint.

use http::header::ACCEPT;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

use super::types::{AccessToken, AuthorizationCode, ClientCredentials, Endpoint, OAuthError};

/// Path of the token endpoint, relative to the authorize base URL
pub const ACCESS_TOKEN_PATH: &str = "/login/oauth/access_token";

/// JSON body sent to the token endpoint
#[derive(Serialize)]
struct AccessTokenRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
}

/// Every shape the token endpoint is known to answer with
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TokenEndpointResponse {
    Granted(GrantedToken),
    Rejected(RejectedExchange),
}

#[derive(Debug, Deserialize)]
struct GrantedToken {
    access_token: String,
    #[serde(default)]
    token_type: String,
    #[serde(default)]
    scope: String,
}

#[derive(Debug, Deserialize)]
struct RejectedExchange {
    error: String,
    error_description: Option<String>,
}

/// Exchanges authorization codes for access tokens
#[derive(Clone)]
pub struct TokenExchanger {
    http: reqwest::Client,
    token_url: Url,
    credentials: Arc<ClientCredentials>,
}

impl TokenExchanger {
    /// Create an exchanger posting to `<authorize_base_url>/login/oauth/access_token`
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::InvalidEndpoint`] if the base URL is invalid
    pub fn new(
        http: reqwest::Client,
        authorize_base_url: &str,
        credentials: Arc<ClientCredentials>,
    ) -> Result<Self, OAuthError> {
        let token_url = Url::parse(&format!(
            "{}{ACCESS_TOKEN_PATH}",
            authorize_base_url.trim_end_matches('/')
        ))
        .map_err(|source| OAuthError::InvalidEndpoint {
            endpoint: "access_token",
            source,
        })?;

        Ok(Self {
            http,
            token_url,
            credentials,
        })
    }

    /// Exchange `code` for an access token
    ///
    /// # Errors
    ///
    /// - [`OAuthError::Unauthorized`] if the code is blank or the provider
    ///   grants an empty token
    /// - [`OAuthError::ProviderRejected`] if the provider answers with an
    ///   OAuth error payload (e.g. `bad_verification_code`)
    /// - [`OAuthError::Transport`] on network failure or timeout
    /// - [`OAuthError::Decode`] if the body is not a token response
    /// - [`OAuthError::UnexpectedStatus`] for a non-success status without an
    ///   error payload
    pub async fn exchange_code(&self, code: &AuthorizationCode) -> Result<AccessToken, OAuthError> {
        if code.secret().trim().is_empty() {
            return Err(OAuthError::Unauthorized(
                "no authorization code on the callback".to_string(),
            ));
        }

        let body = AccessTokenRequest {
            client_id: self.credentials.client_id(),
            client_secret: self.credentials.client_secret(),
            code: code.secret(),
        };

        let response = self
            .http
            .post(self.token_url.clone())
            .header(ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(OAuthError::transport(Endpoint::AccessToken))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(OAuthError::transport(Endpoint::AccessToken))?;

        match serde_json::from_slice::<TokenEndpointResponse>(&bytes) {
            Ok(TokenEndpointResponse::Rejected(rejected)) => {
                tracing::warn!(
                    status = %status,
                    error = %rejected.error,
                    "Token endpoint rejected the authorization code"
                );
                Err(OAuthError::ProviderRejected {
                    error: rejected.error,
                    description: rejected.error_description,
                })
            }
            Ok(TokenEndpointResponse::Granted(granted)) if status.is_success() => {
                if granted.access_token.trim().is_empty() {
                    return Err(OAuthError::Unauthorized(
                        "token endpoint granted an empty access token".to_string(),
                    ));
                }

                tracing::debug!(
                    token_type = %granted.token_type,
                    scope = %granted.scope,
                    "Exchanged authorization code for access token"
                );
                Ok(AccessToken::new(granted.access_token))
            }
            Ok(TokenEndpointResponse::Granted(_)) => Err(OAuthError::UnexpectedStatus {
                endpoint: Endpoint::AccessToken,
                status,
            }),
            Err(_) if !status.is_success() => Err(OAuthError::UnexpectedStatus {
                endpoint: Endpoint::AccessToken,
                status,
            }),
            Err(err) => Err(OAuthError::decode(Endpoint::AccessToken, &err)),
        }
    }
}
