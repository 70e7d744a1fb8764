//! Fixed-window rate limiting keyed by client address.
//!
//! Counters live behind [`RateLimitStore`] so the in-memory map can be
//! replaced by shared storage without touching handlers.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::RateLimitConfig;
use crate::observability::metrics;
use crate::relay::ErrorBody;

const TOO_MANY_REQUESTS: &str = "Too many requests, please try again later.";

/// Mount point covered by the limiter.
pub const LIMITED_PREFIX: &str = "/api";

/// Whether `path` is `/api` or anything below it.
pub fn is_limited_path(path: &str) -> bool {
    path.strip_prefix(LIMITED_PREFIX)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Counter state for one key after recording a hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowHit {
    /// Hits in the current window, including this one.
    pub count: u32,
    /// When the current window ends.
    pub reset_at: Instant,
}

/// Storage for per-client window counters.
pub trait RateLimitStore: Send + Sync {
    /// Record one hit for `key`, opening a new window if the last one ended.
    fn hit(&self, key: &str, window: Duration, now: Instant) -> WindowHit;

    /// Drop windows that ended at or before `now`. Returns how many were removed.
    fn purge_expired(&self, now: Instant) -> usize;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: Instant,
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    windows: DashMap<String, Window>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

impl RateLimitStore for InMemoryStore {
    fn hit(&self, key: &str, window: Duration, now: Instant) -> WindowHit {
        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| Window {
                count: 0,
                reset_at: now + window,
            });

        if now >= entry.reset_at {
            entry.count = 0;
            entry.reset_at = now + window;
        }
        entry.count = entry.count.saturating_add(1);

        WindowHit {
            count: entry.count,
            reset_at: entry.reset_at,
        }
    }

    fn purge_expired(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, w| w.reset_at > now);
        before.saturating_sub(self.windows.len())
    }
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_after: Duration,
}

impl Decision {
    /// Seconds until the window resets, rounded up.
    pub fn reset_secs(&self) -> u64 {
        let secs = self.reset_after.as_secs();
        if self.reset_after.subsec_nanos() > 0 {
            secs + 1
        } else {
            secs
        }
    }
}

/// Rate limiter shared by all `/api/` requests.
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    config: RateLimitConfig,
    trust_forwarded_for: bool,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig, trust_forwarded_for: bool) -> Self {
        Self::with_store(config, trust_forwarded_for, Arc::new(InMemoryStore::new()))
    }

    pub fn with_store(
        config: RateLimitConfig,
        trust_forwarded_for: bool,
        store: Arc<dyn RateLimitStore>,
    ) -> Self {
        Self {
            store,
            config,
            trust_forwarded_for,
        }
    }

    fn window(&self) -> Duration {
        Duration::from_secs(self.config.window_secs)
    }

    /// Count a request from `key` and decide whether it may proceed.
    pub fn check(&self, key: &str, now: Instant) -> Decision {
        let hit = self.store.hit(key, self.window(), now);
        let limit = self.config.max_requests;
        Decision {
            allowed: hit.count <= limit,
            limit,
            remaining: limit.saturating_sub(hit.count),
            reset_after: hit.reset_at.saturating_duration_since(now),
        }
    }

    pub fn purge_expired(&self, now: Instant) -> usize {
        self.store.purge_expired(now)
    }

    /// Client identity: leftmost `X-Forwarded-For` entry when trusted,
    /// otherwise the peer address.
    pub fn client_key(&self, request: &Request<Body>) -> String {
        if self.trust_forwarded_for {
            let forwarded = request
                .headers()
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty());
            if let Some(client) = forwarded {
                return client.to_string();
            }
        }

        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }

    fn apply_headers(&self, headers: &mut HeaderMap, decision: &Decision) {
        if !self.config.standard_headers {
            return;
        }
        let policy = format!("{};w={}", decision.limit, self.config.window_secs);
        if let Ok(value) = HeaderValue::from_str(&policy) {
            headers.insert("ratelimit-policy", value);
        }
        headers.insert("ratelimit-limit", HeaderValue::from(decision.limit));
        headers.insert("ratelimit-remaining", HeaderValue::from(decision.remaining));
        headers.insert("ratelimit-reset", HeaderValue::from(decision.reset_secs()));
    }
}

/// Middleware enforcing the fixed-window limit on every path under
/// [`LIMITED_PREFIX`]. Other paths pass through uncounted.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !is_limited_path(request.uri().path()) {
        return next.run(request).await;
    }

    let key = limiter.client_key(&request);
    let decision = limiter.check(&key, Instant::now());

    if decision.allowed {
        let mut response = next.run(request).await;
        limiter.apply_headers(response.headers_mut(), &decision);
        return response;
    }

    tracing::warn!(client = %key, limit = decision.limit, "Rate limit exceeded");
    metrics::record_rate_limited();

    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(ErrorBody::short(TOO_MANY_REQUESTS)),
    )
        .into_response();
    limiter.apply_headers(response.headers_mut(), &decision);
    response
        .headers_mut()
        .insert("retry-after", HeaderValue::from(decision.reset_secs()));
    response
}

/// Periodically purge ended windows until shutdown.
pub fn spawn_purge_task(
    limiter: Arc<RateLimiter>,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let purged = limiter.purge_expired(Instant::now());
                    if purged > 0 {
                        tracing::debug!(purged, "Purged expired rate limit windows");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Rate limit purge task stopping");
                    break;
                }
            }
        }
    })
}
