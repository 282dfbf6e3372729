//! End-to-end login flow against a mock GitHub

use axum_test::{TestResponse, TestServer};
use github_login::{config::AppConfig, routes, session::LoginState, state::AppState};
use http::header::{HeaderValue, COOKIE, LOCATION, SET_COOKIE};
use http::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "gho_integration_token";

struct Flow {
    cookie: HeaderValue,
    state: String,
}

fn config(github: &MockServer, fetch_organizations: bool) -> AppConfig {
    let mut config = AppConfig::default();
    config.github.client_id = Some("test-client-id".to_string());
    config.github.client_secret = Some("test-client-secret".to_string());
    config.github.authorize_base_url = github.uri();
    config.github.api_base_url = github.uri();
    config.github.fetch_organizations = fetch_organizations;
    config
}

fn serve(config: AppConfig) -> (TestServer, AppState) {
    let state = AppState::from_config(config).unwrap();
    let server = TestServer::new(routes::router(state.clone())).unwrap();
    (server, state)
}

fn app(github: &MockServer, fetch_organizations: bool) -> (TestServer, AppState) {
    serve(config(github, fetch_organizations))
}

async fn mount_token(github: &MockServer, code: &str, token: &str) {
    Mock::given(method("POST"))
        .and(path("/login/oauth/access_token"))
        .and(body_partial_json(json!({
            "client_id": "test-client-id",
            "client_secret": "test-client-secret",
            "code": code,
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": token,
            "token_type": "bearer",
            "scope": "read:org,user",
        })))
        .mount(github)
        .await;
}

async fn mount_user(github: &MockServer, token: &str, login: &str, orgs: Value) {
    let authorization = format!("token {token}");
    Mock::given(method("GET"))
        .and(path("/user"))
        .and(header("authorization", authorization.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "login": login,
            "id": 42,
            "name": "Test User",
        })))
        .mount(github)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/orgs"))
        .and(header("authorization", authorization.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(orgs))
        .mount(github)
        .await;
}

async fn start_login(server: &TestServer) -> Flow {
    let response = server.get("/login/github/").await;
    response.assert_status(StatusCode::MOVED_PERMANENTLY);

    let location = Url::parse(response.header(LOCATION).to_str().unwrap()).unwrap();
    let state = location
        .query_pairs()
        .find(|(key, _)| key == "state")
        .map(|(_, value)| value.into_owned())
        .unwrap();

    let set_cookie = response.header(SET_COOKIE);
    let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();

    Flow {
        cookie: HeaderValue::from_str(pair).unwrap(),
        state,
    }
}

async fn finish_login(server: &TestServer, flow: &Flow, code: &str) -> TestResponse {
    server
        .get("/login/github/callback")
        .add_query_param("code", code)
        .add_query_param("state", &flow.state)
        .add_header(COOKIE, flow.cookie.clone())
        .await
}

async fn logged_in(server: &TestServer, flow: &Flow) -> TestResponse {
    server
        .get("/loggedin")
        .add_header(COOKIE, flow.cookie.clone())
        .await
}

#[tokio::test]
async fn test_index_links_to_login() {
    let github = MockServer::start().await;
    let (server, _) = app(&github, true);

    let response = server.get("/").await;
    response.assert_status_ok();
    assert!(response.text().contains(r#"<a href="/login/github/">LOGIN</a>"#));
}

#[tokio::test]
async fn test_login_redirects_to_consent_screen() {
    let github = MockServer::start().await;
    let (server, _) = app(&github, true);

    let response = server.get("/login/github/").await;
    response.assert_status(StatusCode::MOVED_PERMANENTLY);

    let location = Url::parse(response.header(LOCATION).to_str().unwrap()).unwrap();
    assert_eq!(location.path(), "/login/oauth/authorize");

    let params: Vec<(String, String)> = location.query_pairs().into_owned().collect();
    assert!(params.contains(&("client_id".to_string(), "test-client-id".to_string())));
    assert!(params.contains(&(
        "redirect_uri".to_string(),
        "http://localhost:3000/login/github/callback".to_string()
    )));
    assert!(params.contains(&("scope".to_string(), "user read:org".to_string())));

    let cookie = response.header(SET_COOKIE);
    let cookie = cookie.to_str().unwrap();
    assert!(cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn test_full_login_flow() {
    let github = MockServer::start().await;
    mount_token(&github, "XYZ", TOKEN).await;
    mount_user(&github, TOKEN, "octocat", json!([{"login": "acme"}, {"login": "beta"}])).await;
    let (server, _) = app(&github, true);

    let flow = start_login(&server).await;

    let callback = finish_login(&server, &flow, "XYZ").await;
    callback.assert_status(StatusCode::SEE_OTHER);
    assert_eq!(callback.header(LOCATION), "/loggedin");

    let response = logged_in(&server, &flow).await;
    response.assert_status_ok();

    let text = response.text();
    assert!(text.contains("\n\t\"githubData\""));
    assert!(!text.contains(TOKEN));

    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["githubData"]["login"], "octocat");
    assert_eq!(body["githubOrgs"], json!(["acme", "beta"]));
}

#[tokio::test]
async fn test_result_can_be_viewed_again() {
    let github = MockServer::start().await;
    mount_token(&github, "XYZ", TOKEN).await;
    mount_user(&github, TOKEN, "octocat", json!([])).await;
    let (server, _) = app(&github, true);

    let flow = start_login(&server).await;
    finish_login(&server, &flow, "XYZ")
        .await
        .assert_status(StatusCode::SEE_OTHER);

    let first = logged_in(&server, &flow).await.text();
    let second = logged_in(&server, &flow).await.text();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_organizations_disabled() {
    let github = MockServer::start().await;
    mount_token(&github, "XYZ", TOKEN).await;
    mount_user(&github, TOKEN, "octocat", json!([{"login": "acme"}])).await;
    let (server, _) = app(&github, false);

    let flow = start_login(&server).await;
    finish_login(&server, &flow, "XYZ")
        .await
        .assert_status(StatusCode::SEE_OTHER);

    let body: Value = logged_in(&server, &flow).await.json();
    assert_eq!(body["githubOrgs"], json!([]));

    let org_calls = github
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|request| request.url.path() == "/user/orgs")
        .count();
    assert_eq!(org_calls, 0);
}

#[tokio::test]
async fn test_logged_in_without_session_is_unauthorized() {
    let github = MockServer::start().await;
    let (server, _) = app(&github, true);

    let response = server.get("/loggedin").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    response.assert_json(&json!({"error": "Unauthorized"}));
}

#[tokio::test]
async fn test_logged_in_before_callback_is_unauthorized() {
    let github = MockServer::start().await;
    let (server, _) = app(&github, true);

    let flow = start_login(&server).await;
    logged_in(&server, &flow)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_rejected_code_is_unauthorized() {
    let github = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login/oauth/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": "bad_verification_code",
            "error_description": "The code passed is incorrect or expired.",
        })))
        .mount(&github)
        .await;
    let (server, state) = app(&github, true);

    let flow = start_login(&server).await;
    let response = finish_login(&server, &flow, "stale").await;
    response.assert_status(StatusCode::UNAUTHORIZED);

    let body: Value = response.json();
    assert_eq!(body["error"], "Unauthorized");
    assert_eq!(body["provider_error"], "bad_verification_code");

    logged_in(&server, &flow)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(state.sessions.len(), 1);
}

#[tokio::test]
async fn test_malformed_organizations_is_bad_gateway() {
    let github = MockServer::start().await;
    mount_token(&github, "XYZ", TOKEN).await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"login": "octocat"})))
        .mount(&github)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/orgs"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&github)
        .await;
    let (server, _) = app(&github, true);

    let flow = start_login(&server).await;
    let response = finish_login(&server, &flow, "XYZ").await;
    response.assert_status(StatusCode::BAD_GATEWAY);

    let body: Value = response.json();
    assert_eq!(body["error"], "provider_decode_error");
}

#[tokio::test]
async fn test_unreachable_api_is_bad_gateway() {
    let github = MockServer::start().await;
    mount_token(&github, "XYZ", TOKEN).await;

    let closed = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let closed_port = closed.local_addr().unwrap().port();
    drop(closed);

    let mut config = config(&github, true);
    config.github.api_base_url = format!("http://127.0.0.1:{closed_port}");
    let (server, _) = serve(config);

    let flow = start_login(&server).await;
    let response = finish_login(&server, &flow, "XYZ").await;
    response.assert_status(StatusCode::BAD_GATEWAY);

    let body: Value = response.json();
    assert_eq!(body["error"], "provider_unreachable");

    logged_in(&server, &flow)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_slow_api_is_gateway_timeout() {
    let github = MockServer::start().await;
    mount_token(&github, "XYZ", TOKEN).await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"login": "octocat"}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&github)
        .await;

    let mut config = config(&github, false);
    config.github.request_timeout_secs = 1;
    let (server, _) = serve(config);

    let flow = start_login(&server).await;
    let response = finish_login(&server, &flow, "XYZ").await;
    response.assert_status(StatusCode::GATEWAY_TIMEOUT);

    let body: Value = response.json();
    assert_eq!(body["error"], "provider_timeout");
}

#[tokio::test]
async fn test_provider_error_callback_keeps_completed_login() {
    let github = MockServer::start().await;
    mount_token(&github, "XYZ", TOKEN).await;
    mount_user(&github, TOKEN, "octocat", json!([])).await;
    let (server, state) = app(&github, true);

    let flow = start_login(&server).await;
    finish_login(&server, &flow, "XYZ")
        .await
        .assert_status(StatusCode::SEE_OTHER);

    server
        .get("/login/github/callback")
        .add_query_param("error", "access_denied")
        .add_header(COOKIE, flow.cookie.clone())
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let body: Value = logged_in(&server, &flow).await.json();
    assert_eq!(body["githubData"]["login"], "octocat");
    assert_eq!(state.sessions.len(), 1);
}

#[tokio::test]
async fn test_profile_reaches_browser_unchanged() {
    let raw = r#"{"zeta":1,"login":"octocat","big":18446744073709551616123}"#;
    let github = MockServer::start().await;
    mount_token(&github, "XYZ", TOKEN).await;
    Mock::given(method("GET"))
        .and(path("/user"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(raw, "application/json"))
        .mount(&github)
        .await;
    let (server, _) = app(&github, false);

    let flow = start_login(&server).await;
    finish_login(&server, &flow, "XYZ")
        .await
        .assert_status(StatusCode::SEE_OTHER);

    let text = logged_in(&server, &flow).await.text();
    assert!(text.contains(raw));
}

#[tokio::test]
async fn test_forged_state_is_forbidden() {
    let github = MockServer::start().await;
    let (server, _) = app(&github, true);

    let flow = start_login(&server).await;
    let forged = Flow {
        cookie: flow.cookie.clone(),
        state: "0".repeat(64),
    };

    finish_login(&server, &forged, "XYZ")
        .await
        .assert_status(StatusCode::FORBIDDEN);
    assert!(github.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_callback_replay_is_forbidden() {
    let github = MockServer::start().await;
    mount_token(&github, "XYZ", TOKEN).await;
    mount_user(&github, TOKEN, "octocat", json!([])).await;
    let (server, state) = app(&github, true);

    let flow = start_login(&server).await;
    finish_login(&server, &flow, "XYZ")
        .await
        .assert_status(StatusCode::SEE_OTHER);
    finish_login(&server, &flow, "XYZ")
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let session_id = flow.cookie.to_str().unwrap().split_once('=').unwrap().1;
    let session_id = session_id.parse().unwrap();
    assert!(matches!(
        state.sessions.state(&session_id),
        LoginState::Authenticated(_)
    ));
}

#[tokio::test]
async fn test_concurrent_flows_do_not_cross_contaminate() {
    let github = MockServer::start().await;
    mount_token(&github, "code-a", "token-a").await;
    mount_token(&github, "code-b", "token-b").await;
    mount_user(&github, "token-a", "alice", json!([{"login": "alpha"}])).await;
    mount_user(&github, "token-b", "bob", json!([{"login": "bravo"}])).await;
    let (server, _) = app(&github, true);

    let alice = start_login(&server).await;
    let bob = start_login(&server).await;
    assert_ne!(alice.state, bob.state);

    let (a, b) = tokio::join!(
        finish_login(&server, &alice, "code-a"),
        finish_login(&server, &bob, "code-b"),
    );
    a.assert_status(StatusCode::SEE_OTHER);
    b.assert_status(StatusCode::SEE_OTHER);

    let alice_body: Value = logged_in(&server, &alice).await.json();
    let bob_body: Value = logged_in(&server, &bob).await.json();

    assert_eq!(alice_body["githubData"]["login"], "alice");
    assert_eq!(alice_body["githubOrgs"], json!(["alpha"]));
    assert_eq!(bob_body["githubData"]["login"], "bob");
    assert_eq!(bob_body["githubOrgs"], json!(["bravo"]));
}
