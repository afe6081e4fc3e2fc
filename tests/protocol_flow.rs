//! End-to-end redirect protocol through the relays and the in-process origin.

use std::sync::Arc;

use reqwest::header::{HeaderMap, COOKIE, SET_COOKIE};
use reqwest::StatusCode;
use serde_json::{json, Value};

use say_hi_relay::client::SayHiClient;
use say_hi_relay::origin::{AlwaysFail, NeverFail, ScriptedFailures};

mod common;

const VIEWER_ORIGIN: &str = "https://app.example.com";

fn set_cookie(headers: &HeaderMap) -> String {
    headers
        .get(SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// The `name=value` pair of a `Set-Cookie`, as a browser would send it back.
fn cookie_pair(set_cookie: &str) -> String {
    set_cookie.split(';').next().unwrap_or_default().to_string()
}

async fn post_name(
    client: &reqwest::Client,
    url: &str,
    cookie: Option<&str>,
) -> reqwest::Response {
    let mut request = client
        .post(url)
        .header("Origin", VIEWER_ORIGIN)
        .json(&json!({ "name": "  Ada  " }));
    if let Some(cookie) = cookie {
        request = request.header(COOKIE, cookie);
    }
    request.send().await.unwrap()
}

#[tokio::test]
async fn test_same_origin_recovers_after_two_failures() {
    let failures = Arc::new(ScriptedFailures::new([true, true, false]));
    let stack = common::start_stack(failures.clone(), |_| {}).await;
    let client = common::manual_client();

    let first = post_name(&client, &stack.same_origin_url(), None).await;
    assert_eq!(first.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(first.headers()["location"], "/api");
    assert_eq!(first.headers()["cache-control"], "no-cache");
    assert_eq!(
        set_cookie(first.headers()),
        "RedirectCount=1; HttpOnly; Max-Age=60"
    );
    assert!(first.headers().get("access-control-allow-origin").is_none());

    let cookie = cookie_pair(&set_cookie(first.headers()));
    let second = post_name(&client, &stack.same_origin_url(), Some(&cookie)).await;
    assert_eq!(second.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        set_cookie(second.headers()),
        "RedirectCount=2; HttpOnly; Max-Age=60"
    );

    let cookie = cookie_pair(&set_cookie(second.headers()));
    let third = post_name(&client, &stack.same_origin_url(), Some(&cookie)).await;
    assert_eq!(third.status(), StatusCode::OK);
    let body: Value = third.json().await.unwrap();
    assert_eq!(body, json!({ "message": "Hi Ada!" }));
    assert_eq!(failures.remaining(), 0);
}

#[tokio::test]
async fn test_always_failing_origin_surfaces_after_three_redirects() {
    let stack = common::start_stack(Arc::new(AlwaysFail), |_| {}).await;
    let client = common::manual_client();

    let mut cookie: Option<String> = None;
    for expected in 1..=3 {
        let response = post_name(&client, &stack.same_origin_url(), cookie.as_deref()).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        let set = set_cookie(response.headers());
        assert!(set.starts_with(&format!("RedirectCount={expected};")), "{set}");
        cookie = Some(cookie_pair(&set));
    }

    let last = post_name(&client, &stack.same_origin_url(), cookie.as_deref()).await;
    assert_eq!(last.status(), StatusCode::BAD_GATEWAY);
    assert!(last.headers().get(SET_COOKIE).is_none());
    let body: Value = last.json().await.unwrap();
    assert_eq!(body, json!({ "message": "Bad Gateway: Random failure." }));
}

#[tokio::test]
async fn test_cross_origin_flow_surfaces_failure_with_cors_headers() {
    let stack = common::start_stack(Arc::new(AlwaysFail), |_| {}).await;
    let client = common::manual_client();

    let mut cookie: Option<String> = None;
    for expected in 1..=3 {
        let response = post_name(&client, &stack.cors_url(), cookie.as_deref()).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        let set = set_cookie(response.headers());
        assert_eq!(
            set,
            format!("RedirectCount={expected}; SameSite=None; Secure; HttpOnly; Max-Age=60")
        );
        assert_eq!(
            response.headers()["access-control-allow-origin"],
            VIEWER_ORIGIN
        );
        cookie = Some(cookie_pair(&set));
    }

    let last = post_name(&client, &stack.cors_url(), cookie.as_deref()).await;
    assert_eq!(last.status(), StatusCode::BAD_GATEWAY);
    assert!(last.headers().get(SET_COOKIE).is_none());
    assert_eq!(last.headers()["access-control-allow-origin"], VIEWER_ORIGIN);
    assert_eq!(last.headers()["access-control-allow-credentials"], "true");
    let body: Value = last.json().await.unwrap();
    assert_eq!(body, json!({ "message": "Bad Gateway: Random failure." }));
}

#[tokio::test]
async fn test_custom_ceiling_is_honored() {
    let stack = common::start_stack(Arc::new(AlwaysFail), |config| {
        config.redirect.max_redirects = 1;
    })
    .await;
    let client = common::manual_client();

    let first = post_name(&client, &stack.same_origin_url(), None).await;
    assert_eq!(first.status(), StatusCode::TEMPORARY_REDIRECT);

    let cookie = cookie_pair(&set_cookie(first.headers()));
    let second = post_name(&client, &stack.same_origin_url(), Some(&cookie)).await;
    assert_eq!(second.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_cross_origin_post_redirects_to_viewer_host() {
    let stack = common::start_stack(Arc::new(AlwaysFail), |_| {}).await;
    let client = common::manual_client();

    let response = post_name(&client, &stack.cors_url(), None).await;
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);

    let headers = response.headers();
    assert_eq!(
        headers["location"],
        format!("https://{}/api", stack.cors).as_str()
    );
    assert_eq!(
        set_cookie(headers),
        "RedirectCount=1; SameSite=None; Secure; HttpOnly; Max-Age=60"
    );
    assert_eq!(headers["access-control-allow-origin"], VIEWER_ORIGIN);
    assert_eq!(headers["access-control-allow-credentials"], "true");
    assert_eq!(headers["access-control-allow-methods"], "POST, OPTIONS");
    assert_eq!(headers["access-control-allow-headers"], "Content-Type");
}

#[tokio::test]
async fn test_cross_origin_success_carries_cors_headers() {
    let stack = common::start_stack(Arc::new(NeverFail), |_| {}).await;
    let client = common::manual_client();

    let response = post_name(&client, &stack.cors_url(), None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        VIEWER_ORIGIN
    );
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "message": "Hi Ada!" }));
}

#[tokio::test]
async fn test_cross_origin_preflight() {
    let stack = common::start_stack(Arc::new(NeverFail), |_| {}).await;
    let client = common::manual_client();

    let response = client
        .request(reqwest::Method::OPTIONS, stack.cors_url())
        .header("Origin", VIEWER_ORIGIN)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["access-control-allow-methods"],
        "POST, OPTIONS"
    );
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "message": "Preflight response" }));
}

#[tokio::test]
async fn test_failed_preflight_is_answered_at_the_edge() {
    let stack = common::start_stack(Arc::new(AlwaysFail), |_| {}).await;
    let client = common::manual_client();

    let response = client
        .request(reqwest::Method::OPTIONS, stack.cors_url())
        .header("Origin", VIEWER_ORIGIN)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        VIEWER_ORIGIN
    );
    assert!(response.headers().get(SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_same_origin_get_failure_passes_through() {
    let stack = common::start_stack(Arc::new(AlwaysFail), |_| {}).await;
    let client = common::manual_client();

    let response = client.get(stack.same_origin_url()).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(response.headers().get(SET_COOKIE).is_none());
}

#[tokio::test]
async fn test_origin_rejections_pass_through() {
    let stack = common::start_stack(Arc::new(NeverFail), |_| {}).await;
    let client = common::manual_client();

    let response = client.get(stack.same_origin_url()).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Method Not Allowed" }));

    let response = client
        .post(stack.same_origin_url())
        .json(&json!({ "name": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "error": "Invalid request body" }));
}

#[tokio::test]
async fn test_api_key_is_attached_by_the_relay() {
    let stack = common::start_stack(Arc::new(NeverFail), |config| {
        config.origin.api_key = Some("k3y".to_string());
        config.relays[0].api_key = Some("k3y".to_string());
    })
    .await;
    let client = common::manual_client();

    let keyed = post_name(&client, &stack.same_origin_url(), None).await;
    assert_eq!(keyed.status(), StatusCode::OK);

    let unkeyed = post_name(&client, &stack.cors_url(), None).await;
    assert_eq!(unkeyed.status(), StatusCode::FORBIDDEN);
    let body: Value = unkeyed.json().await.unwrap();
    assert_eq!(body, json!({ "message": "Forbidden" }));
}

#[tokio::test]
async fn test_client_follows_redirects_with_cookie_jar() {
    let failures = Arc::new(ScriptedFailures::new([true, false]));
    let stack = common::start_stack(failures, |_| {}).await;

    let client = SayHiClient::new(stack.same_origin_url()).unwrap();
    let greeting = client.say_hi("Ada Lovelace").await.unwrap();

    assert!(greeting.is_success());
    assert_eq!(greeting.message.as_deref(), Some("Hi Ada Lovelace!"));
}

#[tokio::test]
async fn test_client_reports_exhausted_retries() {
    let stack = common::start_stack(Arc::new(AlwaysFail), |_| {}).await;

    let client = SayHiClient::new(stack.same_origin_url()).unwrap();
    let greeting = client.say_hi("Ada").await.unwrap();

    assert_eq!(greeting.status, StatusCode::BAD_GATEWAY);
    assert_eq!(
        greeting.message.as_deref(),
        Some("Bad Gateway: Random failure.")
    );
}
