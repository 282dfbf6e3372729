//! github-login: server side of the GitHub OAuth2 authorization code flow
//!
//! A browser is sent to GitHub's consent screen, comes back with a one-time
//! code, and the server trades that code for an access token which it uses
//! to read the user's profile and organization memberships. The result is
//! kept in a short-lived server-side session and shown at `/loggedin`.
//!
//! # Routes
//!
//! | Route | Behavior |
//! |-------|----------|
//! | `GET /` | Login link |
//! | `GET /login/github/` | 301 to the consent screen, sets the session cookie |
//! | `GET /login/github/callback` | Exchange and fetch, then 303 to `/loggedin` |
//! | `GET /loggedin` | 200 with the result as JSON, or 401 |
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use github_login::{config::AppConfig, routes, state::AppState};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::load(None)?;
//!     let bind = config.server.bind;
//!     let state = AppState::from_config(config)?;
//!
//!     let listener = tokio::net::TcpListener::bind(bind).await?;
//!     axum::serve(listener, routes::router(state)).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod oauth2;
pub mod observability;
pub mod render;
pub mod routes;
pub mod session;
pub mod state;

/// Commonly used types
pub mod prelude {
    pub use crate::config::AppConfig;
    pub use crate::error::AppError;
    pub use crate::oauth2::{ExchangeResult, GitHubProvider, OAuthError};
    pub use crate::routes::router;
    pub use crate::session::{LoginState, SessionStore};
    pub use crate::state::AppState;
}
