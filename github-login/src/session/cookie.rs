//! Session cookie encoding

use http::header::{HeaderMap, HeaderValue, COOKIE};
use std::str::FromStr;

use super::{SessionError, SessionId};
use crate::config::SessionSettings;

/// Extract the session id from the request's `Cookie` headers
///
/// Returns `None` when the cookie is absent or does not hold a valid id.
#[must_use]
pub fn session_id(headers: &HeaderMap, cookie_name: &str) -> Option<SessionId> {
    for header in headers.get_all(COOKIE) {
        let Ok(cookie_str) = header.to_str() else {
            continue;
        };

        for cookie in cookie_str.split(';') {
            if let Some((name, value)) = cookie.trim().split_once('=') {
                if name.trim() == cookie_name {
                    return SessionId::from_str(value.trim()).ok();
                }
            }
        }
    }

    None
}

/// `Set-Cookie` value binding the browser to `session_id`
///
/// # Errors
///
/// Returns [`SessionError::Cookie`] if the configured cookie name produces
/// an invalid header value
pub fn session_cookie(
    session_id: &SessionId,
    settings: &SessionSettings,
) -> Result<HeaderValue, SessionError> {
    let mut cookie_value = format!(
        "{}={}; Path=/; Max-Age={}; SameSite=Lax; HttpOnly",
        settings.cookie_name,
        session_id.as_str(),
        settings.ttl_secs,
    );

    if settings.secure_cookies {
        cookie_value.push_str("; Secure");
    }

    Ok(HeaderValue::from_str(&cookie_value)?)
}
