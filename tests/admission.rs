//! End-to-end admission pipeline tests.

use std::time::Duration;

use axum::http::StatusCode;
use gatekeeper::config::GatewayConfig;
use gatekeeper::monitor::store::EventFilter;

mod common;

fn fast_window_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.rate_limit.general.limit = 3;
    config.rate_limit.general.window_ms = 1000;
    config
}

fn relaxed_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.rate_limit.general.limit = 100;
    config
}

#[tokio::test]
async fn rate_limit_denies_then_resets() {
    let (addr, state, _shutdown) = common::start_gateway(fast_window_config()).await;
    let client = common::client();
    let url = format!("http://{}/api/echo", addr);

    // Requests 1-3 within the window are admitted.
    for _ in 0..3 {
        let res = client.get(&url).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    // Request 4 is denied with Retry-After and exactly one event.
    let res = client.get(&url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(res.headers().contains_key("retry-after"));

    let events = state.monitor.store().query_events(&EventFilter {
        kind: Some("rate-limit-exceeded".into()),
        ..EventFilter::default()
    });
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].context.ip, "127.0.0.1");
    assert!(events[0].blocked);

    // After the window elapses the identity is admitted again.
    tokio::time::sleep(Duration::from_millis(1100)).await;
    let res = client.get(&url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn rejected_responses_carry_hardening_headers() {
    let (addr, state, _shutdown) = common::start_gateway(relaxed_config()).await;
    let client = common::client();

    state.monitor.block_ip("127.0.0.1", "test block", None);

    let res = client
        .get(format!("http://{}/api/echo", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(res.headers()["x-frame-options"], "DENY");
    assert_eq!(res.headers()["x-content-type-options"], "nosniff");
    // The body leaks no internal reason.
    assert_eq!(res.text().await.unwrap(), "Access denied");
}

#[tokio::test]
async fn csrf_bootstrap_then_validate() {
    let (addr, state, _shutdown) = common::start_gateway(relaxed_config()).await;
    let client = common::client();
    let url = format!("http://{}/api/echo", addr);

    // First mutating contact: passes, and a token cookie is established.
    let res = client
        .post(&url)
        .json(&serde_json::json!({ "hello": "world" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let set_cookie = res.headers()["set-cookie"].to_str().unwrap().to_string();
    assert!(set_cookie.starts_with("csrf_token="));
    assert!(set_cookie.contains("HttpOnly"));
    let token = set_cookie
        .split(';')
        .next()
        .unwrap()
        .trim_start_matches("csrf_token=")
        .to_string();

    // Matching cookie + header passes.
    let res = client
        .post(&url)
        .header("cookie", format!("csrf_token={}", token))
        .header("x-csrf-token", token.clone())
        .json(&serde_json::json!({ "hello": "again" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Mismatched header fails and emits exactly one violation event.
    let res = client
        .post(&url)
        .header("cookie", format!("csrf_token={}", token))
        .header("x-csrf-token", "forged")
        .json(&serde_json::json!({ "hello": "attack" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let events = state.monitor.store().query_events(&EventFilter {
        kind: Some("csrf-violation".into()),
        ..EventFilter::default()
    });
    assert_eq!(events.len(), 1);
}

#[tokio::test]
async fn body_is_sanitized_and_signature_reported() {
    let (addr, state, _shutdown) = common::start_gateway(relaxed_config()).await;
    let client = common::client();

    let res = client
        .post(format!("http://{}/api/echo", addr))
        .json(&serde_json::json!({ "name": "<script>alert(1)</script>" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // The business handler sees escaped content only.
    let body: serde_json::Value = res.json().await.unwrap();
    let name = body["name"].as_str().unwrap();
    assert!(name.starts_with("&lt;script&gt;"));
    assert!(!name.contains('<'));

    // The detector reports asynchronously; give it a beat.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let events = state.monitor.store().query_events(&EventFilter {
        kind: Some("suspicious-activity".into()),
        ..EventFilter::default()
    });
    assert_eq!(events.len(), 1);
    let json = serde_json::to_value(&events[0]).unwrap();
    assert!(json["pattern"].as_str().unwrap().contains("script"));
}

#[tokio::test]
async fn encoded_query_payload_is_detected() {
    let (addr, state, _shutdown) = common::start_gateway(relaxed_config()).await;
    let client = common::client();

    // The script tag arrives percent-encoded, as a browser would send it.
    let res = client
        .get(format!(
            "http://{}/api/echo?q=%3Cscript%3Ealert(1)%3C%2Fscript%3E",
            addr
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(200)).await;
    let events = state.monitor.store().query_events(&EventFilter {
        kind: Some("suspicious-activity".into()),
        ..EventFilter::default()
    });
    assert_eq!(events.len(), 1);
    let json = serde_json::to_value(&events[0]).unwrap();
    assert!(json["pattern"].as_str().unwrap().contains("script"));
}

#[tokio::test]
async fn clean_requests_produce_no_detector_events() {
    let (addr, state, _shutdown) = common::start_gateway(relaxed_config()).await;
    let client = common::client();

    let res = client
        .post(format!("http://{}/api/echo", addr))
        .json(&serde_json::json!({ "title": "Chess Set", "qty": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    tokio::time::sleep(Duration::from_millis(200)).await;
    let events = state.monitor.store().query_events(&EventFilter {
        kind: Some("suspicious-activity".into()),
        ..EventFilter::default()
    });
    assert!(events.is_empty());
}

#[tokio::test]
async fn repeated_injections_auto_block_the_source() {
    let (addr, state, _shutdown) = common::start_gateway(relaxed_config()).await;
    let client = common::client();
    let url = format!("http://{}/api/echo", addr);

    // Suspicious events carry risk 50 each; the default threshold is 150.
    for _ in 0..3 {
        let res = client
            .post(&url)
            .json(&serde_json::json!({ "comment": "<script>alert(1)</script>" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(state.monitor.is_ip_blocked("127.0.0.1"));

    let res = client.get(&url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn auth_brute_force_tracks_target_and_skips_successes() {
    let mut config = GatewayConfig::default();
    config.rate_limit.general.limit = 100;
    config.rate_limit.auth.limit = 3;
    config.rate_limit.auth.window_ms = 60_000;
    let (addr, state, _shutdown) = common::start_gateway(config).await;
    let client = common::client();
    let url = format!("http://{}/api/login", addr);

    // Successful logins never consume attempts.
    for _ in 0..5 {
        let res = client
            .post(&url)
            .json(&serde_json::json!({ "email": "alice@example.com", "password": "demo-password" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    // Three failures exhaust the window for this credential+IP identity.
    for _ in 0..3 {
        let res = client
            .post(&url)
            .json(&serde_json::json!({ "email": "alice@example.com", "password": "wrong" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
    let res = client
        .post(&url)
        .json(&serde_json::json!({ "email": "alice@example.com", "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);

    let events = state.monitor.store().query_events(&EventFilter {
        kind: Some("brute-force-attempt".into()),
        ..EventFilter::default()
    });
    assert_eq!(events.len(), 1);
    let json = serde_json::to_value(&events[0]).unwrap();
    assert_eq!(json["target"], "alice@example.com|127.0.0.1");

    // A different credential from the same IP is unaffected.
    let res = client
        .post(&url)
        .json(&serde_json::json!({ "email": "bob@example.com", "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn shutdown_trigger_stops_the_server() {
    let (addr, _state, shutdown) = common::start_gateway(relaxed_config()).await;
    let client = common::client();
    let url = format!("http://{}/health", addr);

    let res = client.get(&url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    shutdown.trigger();
    tokio::time::sleep(Duration::from_millis(200)).await;

    // The listener is closed; new connections are refused.
    assert!(client.get(&url).send().await.is_err());
}

#[tokio::test]
async fn health_probe_bypasses_the_pipeline() {
    let mut config = GatewayConfig::default();
    config.rate_limit.general.limit = 1;
    let (addr, _state, _shutdown) = common::start_gateway(config).await;
    let client = common::client();

    for _ in 0..5 {
        let res = client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
