//! End-to-end behaviour of the guard in front of a mock origin.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use vote_guard::config::{Environment, GuardConfig};
use vote_guard::http::HttpServer;
use vote_guard::lifecycle::Shutdown;

mod common;

const CLEAN_REPUTATION: &str = r#"{"status":"success","proxy":false,"hosting":false}"#;
const BROWSER_UA: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:140.0) Gecko/20100101 Firefox/140.0";

/// Origin that answers 200 and counts calls.
async fn counting_origin() -> (SocketAddr, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = calls.clone();
    let addr = common::start_programmable_backend(move |req| {
        let c = c.clone();
        async move {
            c.fetch_add(1, Ordering::SeqCst);
            (200, json!({ "origin": req.path() }).to_string())
        }
    })
    .await;
    (addr, calls)
}

async fn guard(config: &GuardConfig) -> (HttpServer, Router) {
    let server = HttpServer::new(config).unwrap();
    let router = server.router();
    (server, router)
}

fn issue_for(server: &HttpServer, ip: &str) -> String {
    server.guard().session().codec().issue(ip).unwrap()
}

fn browser_request(method: &str, uri: &str, ip: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("x-forwarded-for", ip)
        .header("user-agent", BROWSER_UA)
        .header("accept-language", "en-US,en;q=0.9")
}

async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn set_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(SET_COOKIE)
        .map(|v| v.to_str().unwrap().to_string())
}

fn cookie_pair(set_cookie: &str) -> String {
    set_cookie.split(';').next().unwrap().to_string()
}

#[tokio::test]
async fn test_vote_from_clean_ip_proceeds() {
    let (origin, calls) = counting_origin().await;
    let reputation = common::start_mock_backend(200, CLEAN_REPUTATION).await;
    let (server, router) = guard(&common::test_config(origin, reputation)).await;
    let token = issue_for(&server, "8.8.8.8");

    let response = router
        .oneshot(
            browser_request("POST", "/api/servers/vote", "8.8.8.8")
                .header(COOKIE, format!("api_access={}", token))
                .body(Body::from(r#"{"serverId":1}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({ "origin": "/api/servers/vote" }));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_first_vote_without_cookie_is_issued_one_and_forwarded() {
    let (origin, calls) = counting_origin().await;
    let reputation = common::start_mock_backend(200, CLEAN_REPUTATION).await;
    let (server, router) = guard(&common::test_config(origin, reputation)).await;

    let response = router
        .oneshot(
            browser_request("POST", "/api/streamers/vote", "8.8.8.8")
                .body(Body::from(r#"{"streamerId":7}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = set_cookie(&response).expect("first vote should receive an access cookie");
    let token = cookie_pair(&cookie)
        .strip_prefix("api_access=")
        .unwrap()
        .to_string();
    assert!(server.guard().session().codec().validate(&token, "8.8.8.8"));
    assert_eq!(json_body(response).await, json!({ "origin": "/api/streamers/vote" }));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_non_vote_api_post_without_cookie_stays_forbidden() {
    let (origin, calls) = counting_origin().await;
    let reputation = common::start_mock_backend(200, CLEAN_REPUTATION).await;
    let (_, router) = guard(&common::test_config(origin, reputation)).await;

    let response = router
        .oneshot(
            browser_request("POST", "/api/users/123", "8.8.8.8")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await, json!({ "error": "Forbidden2" }));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_vote_from_hosting_ip_is_rejected() {
    let (origin, calls) = counting_origin().await;
    let reputation =
        common::start_mock_backend(200, r#"{"status":"success","proxy":false,"hosting":true}"#).await;
    let (server, router) = guard(&common::test_config(origin, reputation)).await;
    let token = issue_for(&server, "8.8.8.8");

    let response = router
        .oneshot(
            browser_request("POST", "/api/streamers/vote", "8.8.8.8")
                .header(COOKIE, format!("api_access={}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
    assert_eq!(
        json_body(response).await,
        json!({ "success": false, "error": "forbidden5", "reason": "proxy_detected", "canVote": false })
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_vote_with_proxy_headers_skips_reputation() {
    let (origin, _) = counting_origin().await;
    let lookups = Arc::new(AtomicUsize::new(0));
    let l = lookups.clone();
    let reputation = common::start_programmable_backend(move |_| {
        let l = l.clone();
        async move {
            l.fetch_add(1, Ordering::SeqCst);
            (200, CLEAN_REPUTATION.to_string())
        }
    })
    .await;
    let (_, router) = guard(&common::test_config(origin, reputation)).await;

    let response = router
        .oneshot(
            browser_request("POST", "/api/servers/vote", "8.8.8.8")
                .header("via", "1.1 squid")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(lookups.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_vote_fails_closed_when_reputation_is_down() {
    let (origin, calls) = counting_origin().await;
    let reputation = common::start_mock_backend(503, "{}").await;
    let (_, router) = guard(&common::test_config(origin, reputation)).await;

    let response = router
        .oneshot(
            browser_request("POST", "/api/servers/vote", "8.8.8.8")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(response).await["reason"], "proxy_detected");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_get_on_vote_path_is_not_classified() {
    let (origin, _) = counting_origin().await;
    let reputation = common::closed_port().await;
    let (server, router) = guard(&common::test_config(origin, reputation)).await;
    let token = issue_for(&server, "8.8.8.8");

    let response = router
        .oneshot(
            browser_request("GET", "/api/servers/vote", "8.8.8.8")
                .header(COOKIE, format!("api_access={}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_admin_page_without_cookie_redirects() {
    let (origin, calls) = counting_origin().await;
    let reputation = common::closed_port().await;
    let (_, router) = guard(&common::test_config(origin, reputation)).await;

    let response = router
        .oneshot(Request::get("/admin/dashboard").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[LOCATION], "/admin/login?session=expired");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

async fn admin_request(admin_response: (u16, &'static str)) -> Response<Body> {
    let (origin, _) = counting_origin().await;
    let reputation = common::closed_port().await;
    let admin = common::start_programmable_backend(move |req| async move {
        if req.path() == "/api/admin/auth/me" && req.header("cookie") == Some("adminToken=abc123") {
            (admin_response.0, admin_response.1.to_string())
        } else {
            (401, r#"{"success":false}"#.to_string())
        }
    })
    .await;

    let mut config = common::test_config(origin, reputation);
    config.admin.auth_base_url = Some(format!("http://{}", admin));
    let (_, router) = guard(&config).await;

    router
        .oneshot(
            Request::get("/admin/dashboard")
                .header(COOKIE, "adminToken=abc123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn test_admin_page_with_live_session_passes() {
    let response = admin_request((200, r#"{"success":true,"admin":{"id":1}}"#)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({ "origin": "/admin/dashboard" }));
}

#[tokio::test]
async fn test_admin_page_with_rejected_session_redirects_expired() {
    let response = admin_request((200, r#"{"success":false}"#)).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[LOCATION], "/admin/login?session=expired");

    let response = admin_request((401, r#"{"success":true}"#)).await;
    assert_eq!(response.headers()[LOCATION], "/admin/login?session=expired");
}

#[tokio::test]
async fn test_admin_page_with_garbled_response_redirects_error() {
    let response = admin_request((200, "not json")).await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[LOCATION], "/admin/login?session=error");
}

#[tokio::test]
async fn test_admin_page_with_unreachable_endpoint_redirects_error() {
    let (origin, _) = counting_origin().await;
    let reputation = common::closed_port().await;
    let mut config = common::test_config(origin, reputation);
    config.admin.auth_base_url = Some(format!("http://{}", common::closed_port().await));
    let (_, router) = guard(&config).await;

    let response = router
        .oneshot(
            Request::get("/admin/settings")
                .header(COOKIE, "adminToken=abc123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()[LOCATION], "/admin/login?session=error");
}

#[tokio::test]
async fn test_admin_login_and_admin_api_need_no_admin_cookie() {
    let (origin, _) = counting_origin().await;
    let reputation = common::closed_port().await;
    let (_, router) = guard(&common::test_config(origin, reputation)).await;

    let login = router
        .clone()
        .oneshot(Request::get("/admin/login").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(login.status(), StatusCode::OK);

    let admin_api = router
        .oneshot(Request::get("/api/admin/users").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(admin_api.status(), StatusCode::OK);
    assert!(set_cookie(&admin_api).is_none());
}

#[tokio::test]
async fn test_api_without_cookie_is_forbidden_with_fresh_cookie() {
    let (origin, calls) = counting_origin().await;
    let reputation = common::closed_port().await;
    let (_, router) = guard(&common::test_config(origin, reputation)).await;

    let response = router
        .clone()
        .oneshot(
            browser_request("GET", "/api/users/123", "1.2.3.4")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let cookie = set_cookie(&response).expect("rejection should carry a fresh cookie");
    assert_eq!(json_body(response).await, json!({ "error": "Forbidden2" }));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // The reissued cookie works on the next request.
    let retry = router
        .oneshot(
            browser_request("GET", "/api/users/123", "1.2.3.4")
                .header(COOKIE, cookie_pair(&cookie))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(retry.status(), StatusCode::OK);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_api_with_invalid_token_is_forbidden() {
    let (origin, _) = counting_origin().await;
    let reputation = common::closed_port().await;
    let (server, router) = guard(&common::test_config(origin, reputation)).await;

    let garbage = router
        .clone()
        .oneshot(
            browser_request("GET", "/api/users/123", "1.2.3.4")
                .header(COOKIE, "api_access=not-a-token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(garbage.status(), StatusCode::FORBIDDEN);
    assert!(set_cookie(&garbage).is_some());
    assert_eq!(json_body(garbage).await, json!({ "error": "Invalid token" }));

    // Valid token, but bound to a different address.
    let token = issue_for(&server, "8.8.8.8");
    let moved = router
        .oneshot(
            browser_request("GET", "/api/users/123", "1.2.3.4")
                .header(COOKIE, format!("api_access={}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(moved.status(), StatusCode::FORBIDDEN);
    assert_eq!(json_body(moved).await, json!({ "error": "Invalid token" }));
}

#[tokio::test]
async fn test_page_without_cookie_is_reissued_and_forwarded() {
    let (origin, calls) = counting_origin().await;
    let reputation = common::closed_port().await;
    let (server, router) = guard(&common::test_config(origin, reputation)).await;

    let response = router
        .oneshot(
            browser_request("GET", "/servers/42", "5.6.7.8")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let cookie = set_cookie(&response).expect("page should receive a cookie");
    assert!(cookie.starts_with("api_access="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));
    assert!(cookie.contains("Path=/"));
    assert!(cookie.contains("Max-Age=86400"));
    assert!(!cookie.contains("Secure"));

    let token = cookie_pair(&cookie).trim_start_matches("api_access=").to_string();
    assert!(server.guard().session().codec().validate(&token, "5.6.7.8"));
}

#[tokio::test]
async fn test_page_with_valid_cookie_gets_no_new_cookie() {
    let (origin, _) = counting_origin().await;
    let reputation = common::closed_port().await;
    let (server, router) = guard(&common::test_config(origin, reputation)).await;
    let token = issue_for(&server, "5.6.7.8");

    let response = router
        .oneshot(
            browser_request("GET", "/", "5.6.7.8")
                .header(COOKIE, format!("theme=dark; api_access={}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookie(&response).is_none());
}

#[tokio::test]
async fn test_secure_cookie_in_production() {
    let (origin, _) = counting_origin().await;
    let reputation = common::closed_port().await;
    let mut config = common::test_config(origin, reputation);
    config.environment = Environment::Production;
    let (_, router) = guard(&config).await;

    let response = router
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert!(set_cookie(&response).unwrap().contains("; Secure"));
}

#[tokio::test]
async fn test_bypass_keys() {
    let (origin, _) = counting_origin().await;
    let reputation = common::closed_port().await;
    let mut config = common::test_config(origin, reputation);
    config.bypass.api_key = "internal-api-key".to_string();
    let (_, router) = guard(&config).await;

    let allowed = router
        .clone()
        .oneshot(
            Request::get("/api/users/123")
                .header("x-api-key", "internal-api-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(allowed.status(), StatusCode::OK);
    assert!(set_cookie(&allowed).is_none());

    let wrong = router
        .clone()
        .oneshot(
            Request::get("/api/users/123")
                .header("x-api-key", "guessed")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::FORBIDDEN);

    // No admin key is configured: an empty header must not match it.
    let empty = router
        .oneshot(
            Request::get("/api/users/123")
                .header("x-admin-key", "")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(empty.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_bypass_key_does_not_skip_vote_detection() {
    let (origin, _) = counting_origin().await;
    let reputation =
        common::start_mock_backend(200, r#"{"status":"success","proxy":true,"hosting":false}"#).await;
    let mut config = common::test_config(origin, reputation);
    config.bypass.api_key = "internal-api-key".to_string();
    let (_, router) = guard(&config).await;

    let response = router
        .oneshot(
            browser_request("POST", "/api/servers/vote", "8.8.8.8")
                .header("x-api-key", "internal-api-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_excluded_paths_pass_untouched() {
    let (origin, calls) = counting_origin().await;
    let reputation = common::closed_port().await;
    let (_, router) = guard(&common::test_config(origin, reputation)).await;

    for path in ["/_next/static/chunks/app.js", "/_next/image?url=%2Fa.png", "/favicon.ico"] {
        let response = router
            .clone()
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{}", path);
        assert!(set_cookie(&response).is_none(), "{}", path);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let (origin, _) = counting_origin().await;
    let reputation = common::closed_port().await;
    let (_, router) = guard(&common::test_config(origin, reputation)).await;

    let response = router
        .oneshot(Request::get("/favicon.ico").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let id = response.headers().get("x-request-id").expect("request id");
    assert!(uuid::Uuid::parse_str(id.to_str().unwrap()).is_ok());
}

#[tokio::test]
async fn test_upstream_down_is_bad_gateway() {
    let origin = common::closed_port().await;
    let reputation = common::closed_port().await;
    let (_, router) = guard(&common::test_config(origin, reputation)).await;

    let response = router
        .oneshot(Request::get("/favicon.ico").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_served_guard_uses_peer_address() {
    let (origin, calls) = counting_origin().await;
    let reputation = common::closed_port().await;
    let server = HttpServer::new(&common::test_config(origin, reputation)).unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let handle = tokio::spawn(server.run(listener, shutdown.wait()));

    let client = reqwest::Client::builder().no_proxy().build().unwrap();

    let page = client.get(format!("http://{}/", addr)).send().await.unwrap();
    assert_eq!(page.status(), 200);
    let cookie = page
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();

    // No forwarding headers: the token is bound to the loopback peer.
    let api = client
        .get(format!("http://{}/api/users/1", addr))
        .header(reqwest::header::COOKIE, cookie_pair(&cookie))
        .send()
        .await
        .unwrap();
    assert_eq!(api.status(), 200);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    drop(client);
    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server should stop")
        .unwrap()
        .unwrap();
}
