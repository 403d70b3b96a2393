//! Admin API tests: auth tiers, block management, analysis, export, clear.

use axum::http::StatusCode;
use gatekeeper::config::GatewayConfig;
use gatekeeper::monitor::event::{EventContext, SecurityEvent, SecurityEventKind};
use gatekeeper::monitor::store::EventFilter;

mod common;

const OPERATOR_KEY: &str = "admin-secret-key";
const ROOT_KEY: &str = "root-secret-key";

fn suspicious(ip: &str) -> SecurityEvent {
    SecurityEvent::new(
        SecurityEventKind::SuspiciousActivity {
            reason: "signature match".into(),
            pattern: Some("<script".into()),
        },
        EventContext {
            ip: ip.to_string(),
            ..EventContext::default()
        },
    )
}

#[tokio::test]
async fn admin_requires_a_valid_key() {
    let (addr, state, _shutdown) = common::start_gateway(GatewayConfig::default()).await;
    let client = common::client();
    let url = format!("http://{}/admin/stats", addr);

    let res = client.get(&url).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client.get(&url).bearer_auth("wrong-key").send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Both rejected attempts are recorded, attributed to the source IP.
    let events = state.monitor.store().query_events(&EventFilter {
        kind: Some("unauthorized-access".into()),
        ..EventFilter::default()
    });
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.context.ip == "127.0.0.1"));
    assert!(state.monitor.get_ip_analysis("127.0.0.1").is_some());

    let res = client
        .get(&url)
        .bearer_auth(OPERATOR_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let stats: serde_json::Value = res.json().await.unwrap();
    assert!(stats["detection_rules"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn block_api_enforces_and_reports_membership_changes() {
    let (addr, state, _shutdown) = common::start_gateway(GatewayConfig::default()).await;
    let client = common::client();

    let res = client
        .post(format!("http://{}/admin/block/ip", addr))
        .bearer_auth(OPERATOR_KEY)
        .header("x-actor-id", "ops-1")
        .json(&serde_json::json!({ "identifier": "127.0.0.1", "reason": "incident 42" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["changed"], true);

    // Re-blocking is idempotent.
    let res = client
        .post(format!("http://{}/admin/block/ip", addr))
        .bearer_auth(OPERATOR_KEY)
        .json(&serde_json::json!({ "identifier": "127.0.0.1" }))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["changed"], false);

    // The block list reflects the entry with its audit fields.
    let res = client
        .get(format!("http://{}/admin/blocked", addr))
        .bearer_auth(OPERATOR_KEY)
        .send()
        .await
        .unwrap();
    let lists: serde_json::Value = res.json().await.unwrap();
    assert_eq!(lists["ips"][0]["identifier"], "127.0.0.1");
    assert_eq!(lists["ips"][0]["reason"], "incident 42");
    assert_eq!(lists["ips"][0]["blocked_by"], "ops-1");

    // Admission now rejects this client; the admin API keeps working.
    let res = client
        .get(format!("http://{}/api/echo", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .post(format!("http://{}/admin/unblock/ip", addr))
        .bearer_auth(OPERATOR_KEY)
        .json(&serde_json::json!({ "identifier": "127.0.0.1" }))
        .send()
        .await
        .unwrap();
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["changed"], true);
    assert!(!state.monitor.is_ip_blocked("127.0.0.1"));

    let res = client
        .get(format!("http://{}/api/echo", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn user_blocks_mirror_ip_blocks() {
    let (addr, state, _shutdown) = common::start_gateway(GatewayConfig::default()).await;
    let client = common::client();

    let res = client
        .post(format!("http://{}/admin/block/user", addr))
        .bearer_auth(OPERATOR_KEY)
        .json(&serde_json::json!({ "identifier": "mallory" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(state.monitor.is_user_blocked("mallory"));

    // Requests claiming the blocked identity are refused.
    let res = client
        .get(format!("http://{}/api/echo", addr))
        .header("x-user-id", "mallory")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = client
        .post(format!("http://{}/admin/unblock/user", addr))
        .bearer_auth(OPERATOR_KEY)
        .json(&serde_json::json!({ "identifier": "mallory" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(!state.monitor.is_user_blocked("mallory"));
}

#[tokio::test]
async fn analysis_is_missing_until_history_exists() {
    let (addr, state, _shutdown) = common::start_gateway(GatewayConfig::default()).await;
    let client = common::client();

    let res = client
        .get(format!("http://{}/admin/analysis/ip/203.0.113.9", addr))
        .bearer_auth(OPERATOR_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    state.monitor.report_event(suspicious("203.0.113.9"));

    let res = client
        .get(format!("http://{}/admin/analysis/ip/203.0.113.9", addr))
        .bearer_auth(OPERATOR_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let analysis: serde_json::Value = res.json().await.unwrap();
    assert_eq!(analysis["ip"], "203.0.113.9");
    assert!(analysis["risk_score"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn export_honors_format_and_context_flag() {
    let (addr, state, _shutdown) = common::start_gateway(GatewayConfig::default()).await;
    let client = common::client();

    state.monitor.report_event(suspicious("203.0.113.7"));

    // Minimal JSON export strips event context down to the fixed schema.
    let res = client
        .get(format!("http://{}/admin/export", addr))
        .query(&[("format", "json"), ("include_context", "false")])
        .bearer_auth(OPERATOR_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("application/json"));
    let value: serde_json::Value = res.json().await.unwrap();
    let event = value["security_events"][0].as_object().unwrap();
    for key in event.keys() {
        assert!(
            ["id", "type", "severity", "timestamp_ms", "ip", "user_id"].contains(&key.as_str()),
            "unexpected key {} in minimal export",
            key
        );
    }

    let res = client
        .get(format!("http://{}/admin/export", addr))
        .query(&[("format", "csv")])
        .bearer_auth(OPERATOR_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    let body = res.text().await.unwrap();
    assert!(body.starts_with("id,level,timestamp_ms"));
    assert!(body.contains("203.0.113.7"));
}

#[tokio::test]
async fn destructive_clear_is_root_only_and_confirmed() {
    let (addr, state, _shutdown) = common::start_gateway(GatewayConfig::default()).await;
    let client = common::client();
    let url = format!("http://{}/admin/data", addr);

    state.monitor.report_event(suspicious("203.0.113.8"));

    // The operator tier cannot clear.
    let res = client
        .delete(&url)
        .query(&[("target", "events"), ("confirm", "true")])
        .bearer_auth(OPERATOR_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert!(state.monitor.store().event_count() > 0);

    // Root without the confirmation flag is refused.
    let res = client
        .delete(&url)
        .query(&[("target", "events")])
        .bearer_auth(ROOT_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(state.monitor.store().event_count() > 0);

    let res = client
        .delete(&url)
        .query(&[("target", "events"), ("confirm", "true")])
        .bearer_auth(ROOT_KEY)
        .header("x-actor-id", "root-1")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert_eq!(state.monitor.store().event_count(), 0);

    // The wipe itself stays traceable through the log sequence.
    assert!(state.monitor.store().log_count() > 0);
}

#[tokio::test]
async fn activity_default_limit_follows_config() {
    let mut config = GatewayConfig::default();
    config.monitor.recent_events = 2;
    let (addr, state, _shutdown) = common::start_gateway(config).await;
    let client = common::client();

    for i in 1..=3 {
        state
            .monitor
            .report_event(suspicious(&format!("203.0.113.{}", i)));
    }

    let res = client
        .get(format!("http://{}/admin/activity", addr))
        .bearer_auth(OPERATOR_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let events: Vec<serde_json::Value> = res.json().await.unwrap();
    assert_eq!(events.len(), 2);
    // Newest first.
    assert_eq!(events[0]["ip"], "203.0.113.3");

    // An explicit limit still wins over the configured default.
    let res = client
        .get(format!("http://{}/admin/activity", addr))
        .query(&[("limit", "1")])
        .bearer_auth(OPERATOR_KEY)
        .send()
        .await
        .unwrap();
    let events: Vec<serde_json::Value> = res.json().await.unwrap();
    assert_eq!(events.len(), 1);
}

#[tokio::test]
async fn activity_endpoint_filters_by_kind() {
    let (addr, state, _shutdown) = common::start_gateway(GatewayConfig::default()).await;
    let client = common::client();

    state.monitor.report_event(suspicious("203.0.113.1"));
    state.monitor.report_event(SecurityEvent::new(
        SecurityEventKind::CsrfViolation {
            reason: "token mismatch".into(),
        },
        EventContext {
            ip: "203.0.113.2".into(),
            ..EventContext::default()
        },
    ));

    let res = client
        .get(format!("http://{}/admin/activity", addr))
        .query(&[("kind", "csrf-violation")])
        .bearer_auth(OPERATOR_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let events: Vec<serde_json::Value> = res.json().await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["type"], "csrf-violation");
    assert_eq!(events[0]["ip"], "203.0.113.2");
}
