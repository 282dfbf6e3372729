//! Error types and error handling
//!
//! [`AppError`] is what handlers return. Every variant renders as a JSON body
//! `{"error": "...", "message": "..."}` with a status matching its cause.

use axum::response::{IntoResponse, Json, Response};
use http::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::oauth2::OAuthError;
use crate::session::SessionError;

/// Error code used for every 401 body
pub const UNAUTHORIZED: &str = "Unauthorized";

/// HTTP-facing error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request error
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// OAuth2 error
    #[error("OAuth2 error: {0}")]
    OAuth(#[from] OAuthError),

    /// Session error
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// The provider redirected back with an error instead of a code
    #[error("Provider denied the authorization request: {error}")]
    ProviderDenied {
        /// OAuth error code, e.g. `access_denied`
        error: String,
        /// Human readable description, when supplied
        description: Option<String>,
    },

    /// No completed login in this session
    #[error("Unauthorized")]
    Unauthorized,

    /// Server error
    #[error("Server error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    provider_error: Option<&'a str>,
}

impl AppError {
    /// HTTP status this error renders with
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::OAuth(err) => oauth_status(err),
            Self::Session(SessionError::Cookie(_)) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Session(_) => StatusCode::FORBIDDEN,
            Self::ProviderDenied { .. } | Self::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }

    /// Machine readable error code for the response body
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::OAuth(err) => oauth_code(err),
            Self::Session(SessionError::Cookie(_)) | Self::Internal(_) => "internal_error",
            Self::Session(_) => "Forbidden",
            Self::ProviderDenied { .. } | Self::Unauthorized => UNAUTHORIZED,
        }
    }

    fn message(&self) -> Option<String> {
        match self {
            Self::Unauthorized => None,
            Self::Internal(_) => Some("An internal error occurred.".to_string()),
            Self::ProviderDenied {
                description: Some(description),
                ..
            } => Some(description.clone()),
            Self::OAuth(OAuthError::ProviderRejected {
                description: Some(description),
                ..
            }) => Some(description.clone()),
            Self::OAuth(err) => Some(err.to_string()),
            Self::Session(err) => Some(err.to_string()),
            Self::BadRequest(msg) => Some(msg.clone()),
            Self::ProviderDenied { error, .. } => Some(format!("provider returned {error}")),
        }
    }

    fn provider_error(&self) -> Option<&str> {
        match self {
            Self::ProviderDenied { error, .. }
            | Self::OAuth(OAuthError::ProviderRejected { error, .. }) => Some(error),
            _ => None,
        }
    }
}

fn oauth_status(err: &OAuthError) -> StatusCode {
    match err {
        OAuthError::Unauthorized(_) | OAuthError::ProviderRejected { .. } => {
            StatusCode::UNAUTHORIZED
        }
        OAuthError::Transport { source, .. } if source.is_timeout() => {
            StatusCode::GATEWAY_TIMEOUT
        }
        OAuthError::InvalidEndpoint { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        OAuthError::Transport { .. }
        | OAuthError::Decode { .. }
        | OAuthError::UnexpectedStatus { .. } => StatusCode::BAD_GATEWAY,
    }
}

fn oauth_code(err: &OAuthError) -> &'static str {
    match err {
        OAuthError::Unauthorized(_) | OAuthError::ProviderRejected { .. } => UNAUTHORIZED,
        OAuthError::Transport { source, .. } if source.is_timeout() => "provider_timeout",
        OAuthError::Transport { .. } => "provider_unreachable",
        OAuthError::Decode { .. } => "provider_decode_error",
        OAuthError::UnexpectedStatus { .. } => "provider_error",
        OAuthError::InvalidEndpoint { .. } => "internal_error",
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = %self, status = %status, "Request failed");
        } else {
            tracing::warn!(error = %self, status = %status, "Request rejected");
        }

        let body = ErrorBody {
            error: self.code(),
            message: self.message(),
            provider_error: self.provider_error(),
        };

        (status, Json(body)).into_response()
    }
}
