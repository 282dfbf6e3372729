//! Shared HTTP client for provider calls
//!
//! One client is built at startup and reused by the token exchange and the
//! resource fetches, so connections to the provider are pooled.

use crate::config::GitHubSettings;

/// Build the outbound HTTP client
///
/// - Redirects are disabled (`Policy::none`); a redirect from the token
///   endpoint would otherwise replay the client secret to another host
/// - Every request is bounded by the configured request timeout
/// - Connection establishment is bounded separately
///
/// # Errors
///
/// Returns `reqwest::Error` if the TLS backend cannot be initialized
pub fn build_http_client(settings: &GitHubSettings) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .timeout(settings.request_timeout())
        .connect_timeout(settings.connect_timeout())
        .user_agent(settings.user_agent.clone())
        .build()
}
