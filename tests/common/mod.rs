//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use api_relay::config::ProxyConfig;
use api_relay::http::HttpServer;
use api_relay::lifecycle::Shutdown;
use axum::{
    body::{to_bytes, Body},
    http::{HeaderMap, Request},
    response::Response,
    Router,
};
use serde_json::Value;
use tokio::net::TcpListener;

/// A request as seen by the mock upstream.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: HeaderMap,
    pub body: String,
}

/// Mock upstream that records every request it receives.
pub struct MockUpstream {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

#[allow(dead_code)]
impl MockUpstream {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn hits(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

/// Start a programmable upstream on an ephemeral port.
#[allow(dead_code)]
pub async fn start_upstream<F>(respond: F) -> MockUpstream
where
    F: Fn(&RecordedRequest) -> Response + Send + Sync + 'static,
{
    start_upstream_with_delay(Duration::ZERO, respond).await
}

/// Start an upstream that waits `delay` before answering.
pub async fn start_upstream_with_delay<F>(delay: Duration, respond: F) -> MockUpstream
where
    F: Fn(&RecordedRequest) -> Response + Send + Sync + 'static,
{
    let requests = Arc::new(Mutex::new(Vec::new()));
    let respond = Arc::new(respond);

    let recorded = requests.clone();
    let app = Router::new().fallback(move |request: Request<Body>| {
        let recorded = recorded.clone();
        let respond = respond.clone();
        async move {
            let (parts, body) = request.into_parts();
            let bytes = to_bytes(body, usize::MAX).await.unwrap_or_default();
            let request = RecordedRequest {
                method: parts.method.to_string(),
                path: parts.uri.path().to_string(),
                headers: parts.headers,
                body: String::from_utf8_lossy(&bytes).into_owned(),
            };
            let response = respond(&request);
            recorded.lock().unwrap().push(request);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            response
        }
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockUpstream { addr, requests }
}

/// Relay config pointed at local upstreams, with static serving off.
#[allow(dead_code)]
pub fn local_config() -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.server.static_dir = None;
    config.relay.allowed_domains = vec!["127.0.0.1".to_string()];
    config
}

/// A relay server running on an ephemeral port. Shuts down on drop.
pub struct RelayHandle {
    pub addr: SocketAddr,
    client: reqwest::Client,
    shutdown: Shutdown,
}

#[allow(dead_code)]
impl RelayHandle {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// POST a forward request to `/api/proxy`.
    pub async fn proxy(&self, body: Value) -> reqwest::Response {
        self.client
            .post(self.url("/api/proxy"))
            .json(&body)
            .send()
            .await
            .expect("Relay unreachable")
    }
}

impl Drop for RelayHandle {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_relay(config: ProxyConfig) -> RelayHandle {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap();

    RelayHandle {
        addr,
        client,
        shutdown,
    }
}
