//! Short-lived server-side login sessions
//!
//! The browser only ever holds an opaque session id in an `HttpOnly` cookie.
//! The CSRF state, flow progress and the final [`ExchangeResult`] stay on the
//! server and expire with the session.
//!
//! [`ExchangeResult`]: crate::oauth2::ExchangeResult

pub mod cookie;
pub mod store;

pub use cookie::{session_cookie, session_id};
pub use store::{spawn_purge_task, LoginState, SessionStore};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique session identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    /// Generate a new random session id
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from a string (validates format)
    ///
    /// # Errors
    ///
    /// Returns error if the string is not a valid UUID
    pub fn try_from_string(s: String) -> Result<Self, SessionError> {
        Uuid::parse_str(&s)
            .map(|_| Self(s))
            .map_err(|_| SessionError::InvalidSessionId)
    }

    /// Get the session ID as a string reference
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SessionId {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from_string(s.to_string())
    }
}

/// Session errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Invalid session ID format
    #[error("Invalid session ID")]
    InvalidSessionId,

    /// Session not found
    #[error("Session not found")]
    NotFound,

    /// Session expired
    #[error("Session expired")]
    Expired,

    /// The session is not waiting for a callback
    #[error("Session has no login in progress")]
    NotPending,

    /// The callback's `state` does not match the one issued for this session
    #[error("OAuth state mismatch")]
    StateMismatch,

    /// The session cookie could not be encoded as a header
    #[error("Invalid session cookie: {0}")]
    Cookie(#[from] http::header::InvalidHeaderValue),
}
