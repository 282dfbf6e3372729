//! Core OAuth2 types
//!
//! Credentials, the opaque values exchanged during the flow, the data handed
//! back to the session, and the error taxonomy shared by all three steps.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::fmt;

/// OAuth application credentials
///
/// Loaded once at startup and shared read-only. The secret is redacted from
/// `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    client_id: String,
    client_secret: String,
}

impl ClientCredentials {
    /// Create credentials from their two halves
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// OAuth application client ID
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// OAuth application client secret
    #[must_use]
    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .finish()
    }
}

/// One-time authorization code issued by the provider on the callback
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizationCode(String);

impl AuthorizationCode {
    /// Wrap a code received on the callback
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// The raw code
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthorizationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthorizationCode([redacted])")
    }
}

/// Bearer credential returned by the token exchange
///
/// Deliberately has no `Display` or `Serialize` implementation so it can only
/// leave the process in an `Authorization` header.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a token string
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.0
    }

    /// Whether the token is usable at all
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }

    /// Value for the `Authorization` header
    pub(crate) fn authorization_header(&self) -> String {
        format!("token {}", self.0)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken([redacted])")
    }
}

/// Profile document returned by the user endpoint
///
/// Holds the provider's bytes exactly as received. Only JSON validity is
/// checked; key order and number precision are never touched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserProfile(Box<RawValue>);

impl UserProfile {
    /// Wrap an already validated document
    #[must_use]
    pub const fn new(document: Box<RawValue>) -> Self {
        Self(document)
    }

    /// Validate and wrap a JSON document
    ///
    /// # Errors
    ///
    /// Returns `serde_json::Error` if `json` is not a single JSON value
    pub fn from_json(json: impl Into<String>) -> Result<Self, serde_json::Error> {
        RawValue::from_string(json.into()).map(Self)
    }

    /// The document text as received
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.get()
    }

    /// The `login` field, when the provider supplied one
    #[must_use]
    pub fn login(&self) -> Option<String> {
        #[derive(Deserialize)]
        struct Login {
            login: Option<String>,
        }

        serde_json::from_str::<Login>(self.as_str())
            .ok()
            .and_then(|profile| profile.login)
    }
}

impl PartialEq for UserProfile {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

/// Organization logins in provider order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrganizationList(Vec<String>);

impl OrganizationList {
    /// Build from logins already in provider order
    #[must_use]
    pub const fn new(logins: Vec<String>) -> Self {
        Self(logins)
    }

    /// The logins
    #[must_use]
    pub fn logins(&self) -> &[String] {
        &self.0
    }

    /// Number of organizations
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the user belongs to no organizations
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<String> for OrganizationList {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Outcome of a completed login, handed to the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeResult {
    /// Profile document
    #[serde(rename = "githubData")]
    pub profile: UserProfile,

    /// Organization logins (empty when retrieval is disabled)
    #[serde(rename = "githubOrgs")]
    pub organizations: OrganizationList,
}

/// Which provider call an error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// `POST /login/oauth/access_token`
    AccessToken,
    /// `GET /user`
    User,
    /// `GET /user/orgs`
    Organizations,
}

impl Endpoint {
    /// Short name for logs and error bodies
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AccessToken => "access_token",
            Self::User => "user",
            Self::Organizations => "user/orgs",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// OAuth2 errors
///
/// Every failure is scoped to the request that hit it.
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    /// Network, DNS or timeout failure talking to the provider
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        /// Call that failed
        endpoint: Endpoint,
        /// Underlying client error
        source: reqwest::Error,
    },

    /// The provider answered with a body that is not the expected JSON
    #[error("could not decode {endpoint} response: {message}")]
    Decode {
        /// Call whose body was malformed
        endpoint: Endpoint,
        /// Decoder message
        message: String,
    },

    /// No usable access token, or the provider denied the resource
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The token endpoint returned an OAuth error payload
    #[error("provider rejected the authorization code: {error}")]
    ProviderRejected {
        /// OAuth error code, e.g. `bad_verification_code`
        error: String,
        /// Human readable description, when supplied
        description: Option<String>,
    },

    /// The provider answered with a status the flow does not handle
    #[error("{endpoint} returned HTTP {status}")]
    UnexpectedStatus {
        /// Call that failed
        endpoint: Endpoint,
        /// Status returned
        status: http::StatusCode,
    },

    /// A configured endpoint could not be turned into a URL
    #[error("invalid {endpoint} endpoint URL: {source}")]
    InvalidEndpoint {
        /// Endpoint being built
        endpoint: &'static str,
        /// Parse failure
        source: url::ParseError,
    },
}

impl OAuthError {
    /// Whether this failure means the visitor is not authenticated
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_) | Self::ProviderRejected { .. })
    }

    /// Whether the failure was the outbound timeout firing
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport { source, .. } if source.is_timeout())
    }

    pub(crate) fn decode(endpoint: Endpoint, err: &serde_json::Error) -> Self {
        Self::Decode {
            endpoint,
            message: err.to_string(),
        }
    }

    pub(crate) fn transport(endpoint: Endpoint) -> impl Fn(reqwest::Error) -> Self {
        move |source| Self::Transport { endpoint, source }
    }
}
