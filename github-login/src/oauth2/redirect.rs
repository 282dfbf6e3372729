//! Consent screen redirect
//!
//! Builds the provider's `/login/oauth/authorize` URL. Pure construction: no
//! network call is made here.

use oauth2::{
    basic::BasicClient, AuthUrl, ClientId, CsrfToken, EndpointNotSet, EndpointSet, RedirectUrl,
    Scope,
};
use rand::RngCore;
use std::fmt;
use url::Url;

use super::types::OAuthError;

/// Path of the consent endpoint, relative to the authorize base URL
pub const AUTHORIZE_PATH: &str = "/login/oauth/authorize";

/// Client with only the authorization endpoint configured
type RedirectClient = BasicClient<
    EndpointSet,    // HasAuthUrl
    EndpointNotSet, // HasDeviceAuthUrl
    EndpointNotSet, // HasIntrospectionUrl
    EndpointNotSet, // HasRevocationUrl
    EndpointNotSet, // HasTokenUrl
>;

/// Random CSRF token tying a callback to the browser that started the flow
#[derive(Clone, PartialEq, Eq)]
pub struct StateToken(String);

impl StateToken {
    /// Generate a new state token (32 random bytes, hex encoded)
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0_u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Wrap a token received on the callback
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The token value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for StateToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StateToken(..)")
    }
}

/// Builds consent URLs for one OAuth application
pub struct AuthorizationRedirector {
    client: RedirectClient,
    scopes: Vec<Scope>,
}

impl AuthorizationRedirector {
    /// Create a redirector for `client_id` and its registered callback
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::InvalidEndpoint`] if the authorize base URL or
    /// the callback URL is not a valid URL
    pub fn new(
        authorize_base_url: &str,
        client_id: &str,
        callback_url: &str,
        scopes: &[String],
    ) -> Result<Self, OAuthError> {
        let auth_url = format!("{}{AUTHORIZE_PATH}", authorize_base_url.trim_end_matches('/'));

        let client = BasicClient::new(ClientId::new(client_id.to_string()))
            .set_auth_uri(AuthUrl::new(auth_url).map_err(|source| {
                OAuthError::InvalidEndpoint {
                    endpoint: "authorize",
                    source,
                }
            })?)
            .set_redirect_uri(RedirectUrl::new(callback_url.to_string()).map_err(|source| {
                OAuthError::InvalidEndpoint {
                    endpoint: "callback",
                    source,
                }
            })?);

        Ok(Self {
            client,
            scopes: scopes
                .iter()
                .filter(|s| !s.trim().is_empty())
                .map(|s| Scope::new(s.clone()))
                .collect(),
        })
    }

    /// Consent URL carrying `state`
    ///
    /// The URL holds `response_type=code`, `client_id`, `state`,
    /// `redirect_uri` and, when any scopes are configured, a space separated
    /// `scope`.
    #[must_use]
    pub fn authorization_url(&self, state: &StateToken) -> Url {
        let token = state.as_str().to_string();
        let (url, _state) = self
            .client
            .authorize_url(move || CsrfToken::new(token))
            .add_scopes(self.scopes.iter().cloned())
            .url();
        url
    }
}

/// One-shot form of [`AuthorizationRedirector::authorization_url`]
///
/// # Errors
///
/// Returns [`OAuthError::InvalidEndpoint`] if either URL is invalid
pub fn build_authorization_url(
    authorize_base_url: &str,
    client_id: &str,
    callback_url: &str,
    scopes: &[String],
    state: &StateToken,
) -> Result<Url, OAuthError> {
    AuthorizationRedirector::new(authorize_base_url, client_id, callback_url, scopes)
        .map(|redirector| redirector.authorization_url(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    const CALLBACK: &str = "http://localhost:3000/login/github/callback";

    fn query(url: &Url) -> HashMap<String, String> {
        url.query_pairs().into_owned().collect()
    }

    #[test]
    fn test_authorization_url_targets_authorize_endpoint() {
        let state = StateToken::new("abc");
        let url = build_authorization_url(
            "https://github.com",
            "test-client-id",
            CALLBACK,
            &["user".to_string(), "read:org".to_string()],
            &state,
        )
        .unwrap();

        assert!(url
            .as_str()
            .starts_with("https://github.com/login/oauth/authorize?"));

        let params = query(&url);
        assert_eq!(params["client_id"], "test-client-id");
        assert_eq!(params["redirect_uri"], CALLBACK);
        assert_eq!(params["scope"], "user read:org");
        assert_eq!(params["state"], "abc");
        assert_eq!(params["response_type"], "code");
    }

    #[test]
    fn test_redirect_uri_is_escaped() {
        let url = build_authorization_url(
            "https://github.com",
            "id",
            CALLBACK,
            &[],
            &StateToken::new("s"),
        )
        .unwrap();

        assert!(url
            .as_str()
            .contains("redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Flogin%2Fgithub%2Fcallback"));
    }

    #[test]
    fn test_no_scope_parameter_without_scopes() {
        let url = build_authorization_url(
            "https://github.com/",
            "id",
            CALLBACK,
            &[],
            &StateToken::new("s"),
        )
        .unwrap();

        assert!(url.as_str().starts_with("https://github.com/login/oauth/authorize?"));
        assert!(!query(&url).contains_key("scope"));
    }

    #[test]
    fn test_invalid_callback_is_rejected() {
        let result = AuthorizationRedirector::new("https://github.com", "id", "not a url", &[]);
        assert!(matches!(
            result,
            Err(OAuthError::InvalidEndpoint {
                endpoint: "callback",
                ..
            })
        ));
    }

    #[test]
    fn test_state_tokens_are_random_hex() {
        let a = StateToken::generate();
        let b = StateToken::generate();
        assert_eq!(a.as_str().len(), 64);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    proptest! {
        #[test]
        fn prop_client_id_and_scopes_round_trip(
            client_id in "[A-Za-z0-9._-]{1,40}",
            path in "[a-z]{1,12}",
            scopes in proptest::collection::vec("[a-z]{1,8}(:[a-z]{1,8})?", 0..4),
        ) {
            let callback = format!("https://app.example.com/{path}/callback?x=1&y=2");
            let url = build_authorization_url(
                "https://github.com",
                &client_id,
                &callback,
                &scopes,
                &StateToken::new("state"),
            ).unwrap();

            let params: Vec<(String, String)> = url.query_pairs().into_owned().collect();
            let client_ids: Vec<_> = params.iter().filter(|(k, _)| k == "client_id").collect();
            prop_assert_eq!(client_ids.len(), 1);
            prop_assert_eq!(&client_ids[0].1, &client_id);

            let redirect = params.iter().find(|(k, _)| k == "redirect_uri").map(|(_, v)| v.clone());
            prop_assert_eq!(redirect.as_deref(), Some(callback.as_str()));

            let scope = params.iter().find(|(k, _)| k == "scope").map(|(_, v)| v.clone());
            if scopes.is_empty() {
                prop_assert!(scope.is_none());
            } else {
                prop_assert_eq!(scope, Some(scopes.join(" ")));
            }
        }
    }
}
