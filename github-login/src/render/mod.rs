//! Presentation of the landing page and the login result

use axum::extract::State;
use axum::response::{Html, IntoResponse, Response};
use http::header::{HeaderMap, CACHE_CONTROL, CONTENT_TYPE};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::error::AppError;
use crate::oauth2::ExchangeResult;
use crate::session;
use crate::state::AppState;

/// Landing page with the login link
pub const INDEX_HTML: &str = r#"<a href="/login/github/">LOGIN</a>"#;

/// `GET /`
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// `GET /loggedin`
///
/// Renders the session's login result, or 401 when there is none.
pub async fn logged_in_page(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let result = session::session_id(&headers, &state.config.session.cookie_name)
        .and_then(|id| state.sessions.result(&id));

    logged_in(result.as_ref())
}

/// Response for a login result
///
/// `None` renders `401 {"error": "Unauthorized"}`; otherwise the result is
/// returned as tab-indented JSON with the profile embedded exactly as the
/// provider sent it.
#[must_use]
pub fn logged_in(result: Option<&ExchangeResult>) -> Response {
    let Some(result) = result else {
        return AppError::Unauthorized.into_response();
    };

    match to_pretty_json(result) {
        Ok(body) => (
            [
                (CONTENT_TYPE, "application/json"),
                (CACHE_CONTROL, "no-store"),
            ],
            body,
        )
            .into_response(),
        Err(err) => AppError::Internal(format!("JSON encode error: {err}")).into_response(),
    }
}

/// Re-indent a JSON document with tabs
///
/// # Errors
///
/// Returns `serde_json::Error` if `raw` is not valid JSON
pub fn pretty_json(raw: &str) -> Result<String, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(raw)?;
    to_pretty_json(&value)
}

/// Serialize `value` as tab-indented JSON
///
/// # Errors
///
/// Returns `serde_json::Error` if `value` cannot be serialized
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    let mut buf = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"\t"));
    value.serialize(&mut serializer)?;

    // serde_json only ever writes UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth2::{OrganizationList, UserProfile};
    use axum::body::to_bytes;
    use http::StatusCode;
    use proptest::prelude::*;

    fn result() -> ExchangeResult {
        ExchangeResult {
            profile: UserProfile::from_json(r#"{"login":"octocat","id":1}"#).unwrap(),
            organizations: OrganizationList::new(vec!["acme".to_string(), "beta".to_string()]),
        }
    }

    #[test]
    fn test_tab_indentation() {
        let pretty = pretty_json(r#"{"a":[1,2]}"#).unwrap();
        assert_eq!(pretty, "{\n\t\"a\": [\n\t\t1,\n\t\t2\n\t]\n}");
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        assert!(pretty_json("{not json").is_err());
    }

    #[tokio::test]
    async fn test_no_result_is_unauthorized() {
        let response = logged_in(None);
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "Unauthorized");
    }

    #[tokio::test]
    async fn test_result_is_pretty_printed() {
        let response = logged_in(Some(&result()));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[CONTENT_TYPE],
            "application/json"
        );

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("\n\t\"githubData\": {"));

        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["githubData"]["login"], "octocat");
        assert_eq!(json["githubOrgs"], serde_json::json!(["acme", "beta"]));
    }

    #[tokio::test]
    async fn test_profile_is_embedded_verbatim() {
        let raw = r#"{"zeta":1,"alpha":2,"big":18446744073709551616123}"#;
        let result = ExchangeResult {
            profile: UserProfile::from_json(raw).unwrap(),
            organizations: OrganizationList::default(),
        };

        let response = logged_in(Some(&result));
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();

        assert!(text.contains(&format!("\n\t\"githubData\": {raw}")));
    }

    proptest! {
        #[test]
        fn prop_pretty_printing_is_idempotent(
            entries in proptest::collection::btree_map("[a-z]{1,6}", any::<i32>(), 0..6),
            tags in proptest::collection::vec("[ -~]{0,10}", 0..4),
        ) {
            let raw = serde_json::json!({ "entries": entries, "tags": tags }).to_string();
            let once = pretty_json(&raw).unwrap();
            let twice = pretty_json(&once).unwrap();
            prop_assert_eq!(&once, &twice);

            let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
            let reparsed: serde_json::Value = serde_json::from_str(&once).unwrap();
            prop_assert_eq!(parsed, reparsed);
        }
    }
}
