//! GitHub OAuth2 authorization code flow
//!
//! The flow runs in three steps:
//! - **Redirect**: [`AuthorizationRedirector`] builds the consent URL carrying
//!   a CSRF [`StateToken`]
//! - **Exchange**: [`TokenExchanger`] trades the callback's code for an
//!   [`AccessToken`] with a server-to-server `POST`
//! - **Fetch**: [`ProfileFetcher`] reads `/user` and, when enabled,
//!   `/user/orgs` with that token
//!
//! [`GitHubProvider`] composes the three and is what the HTTP handlers use.
//!
//! # Security Considerations
//!
//! - Access tokens never leave the request that obtained them and have no
//!   `Display` or `Serialize` implementation
//! - State tokens are one-time use and bound to the browser's session
//! - Outbound calls are bounded by explicit timeouts and never follow
//!   redirects
//! - Decode failures are reported as errors, never as empty data

pub mod handlers;
pub mod http;
pub mod profile;
pub mod provider;
pub mod redirect;
pub mod token;
pub mod types;

pub use handlers::{callback, login};
pub use self::http::build_http_client;
pub use profile::ProfileFetcher;
pub use provider::GitHubProvider;
pub use redirect::{build_authorization_url, AuthorizationRedirector, StateToken};
pub use token::TokenExchanger;
pub use types::{
    AccessToken, AuthorizationCode, ClientCredentials, Endpoint, ExchangeResult, OAuthError,
    OrganizationList, UserProfile,
};
