//! OAuth2 HTTP handlers
//!
//! - `GET /login/github/` starts a flow and redirects to the consent screen
//! - `GET /login/github/callback` finishes it and redirects to `/loggedin`

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use http::header::{HeaderMap, HeaderValue, CACHE_CONTROL, LOCATION, SET_COOKIE};
use http::StatusCode;
use serde::Deserialize;

use super::types::AuthorizationCode;
use crate::error::AppError;
use crate::session::{self, SessionError};
use crate::state::AppState;

/// Where the callback sends the browser after a successful login
pub const LOGGED_IN_PATH: &str = "/loggedin";

/// OAuth2 callback query parameters
#[derive(Debug, Default, Deserialize)]
pub struct CallbackParams {
    /// Authorization code from provider
    pub code: Option<String>,
    /// CSRF state token
    pub state: Option<String>,
    /// Optional error from provider
    pub error: Option<String>,
    /// Optional error description
    pub error_description: Option<String>,
}

/// Initiate the OAuth2 flow
///
/// Starts a fresh session holding a new CSRF state token, sets the session
/// cookie and redirects (301) to the consent screen.
///
/// # Errors
///
/// Returns [`AppError`] if the cookie or `Location` header cannot be encoded
pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let settings = &state.config.session;
    let previous = session::session_id(&headers, &settings.cookie_name);
    let (session_id, csrf_state) = state.sessions.begin(previous.as_ref());

    let auth_url = state.provider.authorization_url(&csrf_state);
    let location = HeaderValue::from_str(auth_url.as_str())
        .map_err(|e| AppError::Internal(format!("Invalid authorization URL: {e}")))?;
    let cookie = session::session_cookie(&session_id, settings)?;

    tracing::info!(session_id = %session_id, "Redirecting to GitHub consent screen");

    let mut response = StatusCode::MOVED_PERMANENTLY.into_response();
    let response_headers = response.headers_mut();
    response_headers.insert(LOCATION, location);
    response_headers.insert(SET_COOKIE, cookie);
    response_headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));

    Ok(response)
}

/// Handle the OAuth2 callback
///
/// This handler:
/// 1. Rejects callbacks without a session (403)
/// 2. Ends a pending flow if the provider reported an error (401)
/// 3. Validates and consumes the CSRF state (403 on mismatch)
/// 4. Exchanges the code and fetches the profile
/// 5. Stores the result in the session and redirects (303) to `/loggedin`
///
/// # Errors
///
/// Returns [`AppError`] for any of the failures above, or the provider error
/// that ended the exchange
pub async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Result<Response, AppError> {
    let session_id = session::session_id(&headers, &state.config.session.cookie_name)
        .ok_or(SessionError::NotFound)?;

    if let Some(error) = params.error {
        if let Err(e) = state
            .sessions
            .abandon(&session_id, params.state.as_deref())
        {
            tracing::debug!(
                session_id = %session_id,
                error = %e,
                "Provider error callback left session unchanged"
            );
        }
        return Err(AppError::ProviderDenied {
            error,
            description: params.error_description,
        });
    }

    if let Err(e) = state
        .sessions
        .take_pending(&session_id, params.state.as_deref().unwrap_or_default())
    {
        tracing::warn!(
            session_id = %session_id,
            error = %e,
            "OAuth2 state validation failed (potential CSRF attack)"
        );
        return Err(e.into());
    }

    let Some(code) = params.code.filter(|code| !code.trim().is_empty()) else {
        state.sessions.fail(&session_id)?;
        return Err(AppError::BadRequest(
            "callback is missing the `code` parameter".to_string(),
        ));
    };

    match state
        .provider
        .complete_login(&AuthorizationCode::new(code))
        .await
    {
        Ok(result) => {
            let login = result.profile.login();
            tracing::info!(
                session_id = %session_id,
                login = login.as_deref().unwrap_or("<unknown>"),
                organizations = result.organizations.len(),
                "GitHub login completed"
            );
            state.sessions.complete(&session_id, result)?;
            Ok(Redirect::to(LOGGED_IN_PATH).into_response())
        }
        Err(e) => {
            if let Err(session_error) = state.sessions.fail(&session_id) {
                tracing::debug!(
                    session_id = %session_id,
                    error = %session_error,
                    "Session ended before the failed exchange was recorded"
                );
            }
            Err(e.into())
        }
    }
}
