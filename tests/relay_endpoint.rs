//! End-to-end tests for `POST /api/proxy`.

use std::time::Duration;

use api_relay::config::RelayConfig;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

mod common;

fn json_response(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

#[tokio::test]
async fn test_missing_url_is_rejected_without_upstream_call() {
    let upstream = common::start_upstream(|_| json_response(StatusCode::OK, json!({}))).await;
    let relay = common::start_relay(common::local_config()).await;

    for body in [json!({}), json!({"url": ""}), json!({"method": "GET", "body": {"a": 1}})] {
        let res = relay.proxy(body).await;
        assert_eq!(res.status(), 400);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body, json!({"error": "URL is required"}));
    }

    assert_eq!(upstream.hits(), 0);
}

#[tokio::test]
async fn test_empty_request_body_reads_as_missing_url() {
    let relay = common::start_relay(common::local_config()).await;

    let res = relay
        .client()
        .post(relay.url("/api/proxy"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "URL is required");
}

#[tokio::test]
async fn test_malformed_json_body_is_bad_request() {
    let relay = common::start_relay(common::local_config()).await;

    let res = relay
        .client()
        .post(relay.url("/api/proxy"))
        .header("content-type", "application/json")
        .body("{\"url\": ")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 400);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Invalid JSON body");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_disallowed_domain_is_forbidden_without_upstream_call() {
    let upstream = common::start_upstream(|_| json_response(StatusCode::OK, json!({}))).await;
    let mut config = common::local_config();
    config.relay.allowed_domains = vec!["now.gg".to_string()];
    let relay = common::start_relay(config).await;

    let local = upstream.url("/x");
    for url in ["https://evil.com/x", local.as_str(), "mailto:someone@now.gg"] {
        let res = relay.proxy(json!({"url": url})).await;
        assert_eq!(res.status(), 403, "url {url}");
        let body: Value = res.json().await.unwrap();
        assert_eq!(body, json!({"error": "Domain not allowed"}));
    }

    assert_eq!(upstream.hits(), 0);
}

#[tokio::test]
async fn test_malformed_url_is_reported_as_proxy_failure() {
    let relay = common::start_relay(common::local_config()).await;

    let res = relay.proxy(json!({"url": "not a url"})).await;

    assert_eq!(res.status(), 500);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Proxy request failed");
    assert_eq!(body["code"], "INVALID_URL");
    assert!(body["message"].as_str().unwrap().contains("Invalid URL"));
}

#[tokio::test]
async fn test_json_response_passed_through_with_status() {
    let upstream = common::start_upstream(|req| {
        if req.path == "/missing" {
            json_response(StatusCode::NOT_FOUND, json!({"error": "nope"}))
        } else {
            json_response(StatusCode::CREATED, json!({"ok": true, "items": [1, 2, 3]}))
        }
    })
    .await;
    let relay = common::start_relay(common::local_config()).await;

    let res = relay
        .proxy(json!({"url": upstream.url("/v1/auth"), "body": {"user": "a"}}))
        .await;
    assert_eq!(res.status(), 201);
    assert_eq!(res.headers()["content-type"], "application/json");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"ok": true, "items": [1, 2, 3]}));

    let res = relay.proxy(json!({"url": upstream.url("/missing")})).await;
    assert_eq!(res.status(), 404);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"error": "nope"}));
}

#[tokio::test]
async fn test_non_json_response_is_wrapped() {
    let upstream = common::start_upstream(|_| (StatusCode::OK, "not json").into_response()).await;
    let relay = common::start_relay(common::local_config()).await;

    let res = relay.proxy(json!({"url": upstream.url("/")})).await;

    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(
        body,
        json!({"rawResponse": "not json", "parseError": "Response is not valid JSON"})
    );
}

#[tokio::test]
async fn test_simple_preset_wraps_without_parse_error_or_headers() {
    let upstream = common::start_upstream(|_| {
        (StatusCode::BAD_GATEWAY, [("x-upstream", "1")], "<html>down</html>").into_response()
    })
    .await;
    let mut config = common::local_config();
    config.relay = RelayConfig {
        allowed_domains: vec!["127.0.0.1".to_string()],
        ..RelayConfig::simple()
    };
    let relay = common::start_relay(config).await;

    let res = relay.proxy(json!({"url": upstream.url("/")})).await;

    assert_eq!(res.status(), 502);
    assert!(res.headers().get("x-upstream").is_none());
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"rawResponse": "<html>down</html>"}));
}

#[tokio::test]
async fn test_get_omits_body() {
    let upstream = common::start_upstream(|_| json_response(StatusCode::OK, json!({}))).await;
    let relay = common::start_relay(common::local_config()).await;

    let res = relay
        .proxy(json!({"url": upstream.url("/get"), "method": "GET", "body": {"secret": 1}}))
        .await;
    assert_eq!(res.status(), 200);

    let requests = upstream.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].body, "");
}

#[tokio::test]
async fn test_post_forwards_body_and_sanitized_headers() {
    let upstream = common::start_upstream(|_| json_response(StatusCode::OK, json!({}))).await;
    let relay = common::start_relay(common::local_config()).await;

    let res = relay
        .proxy(json!({
            "url": upstream.url("/login"),
            "body": {"email": "a@b.c"},
            "headers": {
                "Host": "attacker.example",
                "Origin": "https://app.example",
                "referer": "https://app.example/page",
                "accept": "text/plain",
                "X-Client": "web"
            }
        }))
        .await;
    assert_eq!(res.status(), 200);

    let requests = upstream.requests();
    assert_eq!(requests.len(), 1);
    let req = &requests[0];
    assert_eq!(req.method, "POST");
    assert_eq!(req.path, "/login");
    assert_eq!(serde_json::from_str::<Value>(&req.body).unwrap(), json!({"email": "a@b.c"}));

    assert_eq!(req.headers["host"], upstream.addr.to_string());
    assert!(req.headers.get("origin").is_none());
    assert!(req.headers.get("referer").is_none());
    assert_eq!(req.headers["accept"], "text/plain");
    assert_eq!(req.headers["content-type"], "application/json");
    assert_eq!(req.headers["x-client"], "web");
    assert!(req.headers["user-agent"]
        .to_str()
        .unwrap()
        .starts_with("Mozilla/5.0"));
}

#[tokio::test]
async fn test_upstream_headers_forwarded_except_framing() {
    let upstream = common::start_upstream(|_| {
        (
            StatusCode::OK,
            [
                ("x-upstream", "yes"),
                ("content-encoding", "identity"),
                ("content-type", "text/html"),
            ],
            "{\"a\":1}",
        )
            .into_response()
    })
    .await;
    let relay = common::start_relay(common::local_config()).await;

    let res = relay.proxy(json!({"url": upstream.url("/")})).await;

    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["x-upstream"], "yes");
    assert!(res.headers().get("content-encoding").is_none());
    assert_eq!(res.headers()["content-type"], "application/json");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"a": 1}));
}

#[tokio::test]
async fn test_dns_failure_reports_resolution_error() {
    let mut config = common::local_config();
    config.relay.allowed_domains = vec!["relay-test.invalid".to_string()];
    config.relay.timeout_ms = None;
    let relay = common::start_relay(config).await;

    let res = relay
        .proxy(json!({"url": "http://relay-test.invalid/v1/auth"}))
        .await;

    assert_eq!(res.status(), 500);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Proxy request failed");
    assert_eq!(body["code"], "DNS_RESOLUTION_FAILED");
    assert_eq!(body["type"], "network");
    assert!(body["suggestion"].as_str().unwrap().contains("authentication"));
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_connection_refused_reports_connect_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let closed = listener.local_addr().unwrap();
    drop(listener);

    let relay = common::start_relay(common::local_config()).await;
    let res = relay
        .proxy(json!({"url": format!("http://{closed}/")}))
        .await;

    assert_eq!(res.status(), 500);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "CONNECTION_FAILED");
    assert!(body.get("suggestion").is_none());
}

#[tokio::test]
async fn test_slow_upstream_times_out_once() {
    let upstream = common::start_upstream_with_delay(Duration::from_secs(3), |_| {
        json_response(StatusCode::OK, json!({}))
    })
    .await;
    let mut config = common::local_config();
    config.relay.timeout_ms = Some(200);
    let relay = common::start_relay(config).await;

    let res = relay.proxy(json!({"url": upstream.url("/slow")})).await;

    assert_eq!(res.status(), 500);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["code"], "TIMEOUT");
    assert_eq!(body["type"], "timeout");
    assert_eq!(upstream.hits(), 1, "no retry after timeout");
}

#[tokio::test]
async fn test_request_deadline_answers_with_json_failure() {
    let upstream = common::start_upstream_with_delay(Duration::from_secs(3), |_| {
        json_response(StatusCode::OK, json!({}))
    })
    .await;
    let mut config = common::local_config();
    config.relay = RelayConfig {
        allowed_domains: vec!["127.0.0.1".to_string()],
        ..RelayConfig::simple()
    };
    config.server.request_timeout_secs = 1;
    let relay = common::start_relay(config).await;

    let res = relay.proxy(json!({"url": upstream.url("/slow")})).await;

    assert_eq!(res.status(), 500);
    assert_eq!(res.headers()["content-type"], "application/json");
    let body: Value = res.json().await.unwrap();
    assert_eq!(
        body,
        json!({"error": "Proxy request failed", "message": "Request timed out after 1s"})
    );
}

#[tokio::test]
async fn test_simple_preset_errors_are_terse() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let closed = listener.local_addr().unwrap();
    drop(listener);

    let mut config = common::local_config();
    config.relay = RelayConfig {
        allowed_domains: vec!["127.0.0.1".to_string()],
        ..RelayConfig::simple()
    };
    let relay = common::start_relay(config).await;

    let res = relay
        .proxy(json!({"url": format!("http://{closed}/")}))
        .await;

    assert_eq!(res.status(), 500);
    let body: Value = res.json().await.unwrap();
    let fields: Vec<&String> = body.as_object().unwrap().keys().collect();
    assert_eq!(fields, vec!["error", "message"]);
}

#[tokio::test]
async fn test_repeated_request_yields_identical_output() {
    let upstream = common::start_upstream(|_| {
        json_response(StatusCode::ACCEPTED, json!({"token": "abc"}))
    })
    .await;
    let relay = common::start_relay(common::local_config()).await;
    let request = json!({"url": upstream.url("/auth"), "body": {"x": 1}});

    let first = relay.proxy(request.clone()).await;
    let first_status = first.status();
    let first_body: Value = first.json().await.unwrap();

    let second = relay.proxy(request).await;
    assert_eq!(second.status(), first_status);
    let second_body: Value = second.json().await.unwrap();
    assert_eq!(second_body, first_body);
}
