//! HTTP routes

use axum::{routing::get, Router};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::oauth2::handlers::{callback, login, LOGGED_IN_PATH};
use crate::render::{index, logged_in_page};
use crate::state::AppState;

/// Path that starts the login flow
pub const LOGIN_PATH: &str = "/login/github/";

/// Path GitHub redirects back to
pub const CALLBACK_PATH: &str = "/login/github/callback";

/// Build the application router
pub fn router(state: AppState) -> Router {
    let request_timeout = state.config.server.request_timeout();

    Router::new()
        .route("/", get(index))
        .route(LOGIN_PATH, get(login))
        .route(CALLBACK_PATH, get(callback))
        .route(LOGGED_IN_PATH, get(logged_in_page))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
