//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Browser-like user agent sent upstream by the hardened preset.
pub const DESKTOP_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Root configuration for the relay server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener, environment, and request-level limits.
    pub server: ServerConfig,

    /// Relay handler behavior (allow-list, headers, timeout).
    pub relay: RelayConfig,

    /// Rate limiting for `/api/` routes.
    pub rate_limit: RateLimitConfig,

    /// Security response headers.
    pub security: SecurityConfig,

    /// Cross-origin settings.
    pub cors: CorsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Runtime environment. Only `development` changes behavior.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    /// Parse an environment name. Anything other than `development` is production.
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("development") {
            Environment::Development
        } else {
            Environment::Production
        }
    }

    pub fn is_development(self) -> bool {
        self == Environment::Development
    }
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub host: String,

    /// Listen port.
    pub port: u16,

    /// Runtime environment.
    pub environment: Environment,

    /// Directory served as static assets. `None` disables static serving.
    pub static_dir: Option<PathBuf>,

    /// Use the leftmost `X-Forwarded-For` entry as the client address.
    pub trust_forwarded_for: bool,

    /// Maximum accepted request body in bytes.
    pub max_body_size: usize,

    /// Total time allowed for handling one inbound request, in seconds.
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    /// Socket address string for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            environment: Environment::Production,
            static_dir: Some(PathBuf::from("public")),
            trust_forwarded_for: true,
            max_body_size: 100 * 1024,
            request_timeout_secs: 30,
        }
    }
}

/// How an upstream host is compared against the allow-list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainMatch {
    /// Host contains an allowed domain anywhere. Accepts `now.gg.evil.com`.
    #[default]
    Substring,
    /// Host equals an allowed domain or is a subdomain of it.
    Suffix,
}

/// Relay handler configuration.
///
/// Fields not present in a config file take the values of [`RelayConfig::hardened`].
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Domains an upstream host must match.
    pub allowed_domains: Vec<String>,

    /// Matching mode for `allowed_domains`.
    pub domain_match: DomainMatch,

    /// Headers sent upstream unless the caller overrides them.
    pub default_headers: BTreeMap<String, String>,

    /// Headers removed from the outbound request after merging.
    pub stripped_headers: Vec<String>,

    /// Outbound request timeout in milliseconds. `None` or `0` leaves it
    /// unbounded; config files use `0` since TOML has no null.
    pub timeout_ms: Option<u64>,

    /// Number of characters of the upstream body written to the log.
    pub log_preview_chars: usize,

    /// Copy upstream response headers onto the relay response.
    pub forward_response_headers: bool,

    /// Add `parseError` to the raw-text fallback body.
    pub include_parse_error: bool,

    /// Add `code`, `type` and `suggestion` to proxy failure bodies.
    pub detailed_errors: bool,
}

impl RelayConfig {
    /// Full-featured relay: browser UA, referer stripping, 10s timeout,
    /// response header passthrough and detailed errors.
    pub fn hardened() -> Self {
        Self {
            allowed_domains: vec![
                "now.gg".to_string(),
                "api.now.gg".to_string(),
                "account.api.now.gg".to_string(),
            ],
            domain_match: DomainMatch::Substring,
            default_headers: base_headers(Some(DESKTOP_USER_AGENT)),
            stripped_headers: vec![
                "host".to_string(),
                "origin".to_string(),
                "referer".to_string(),
            ],
            timeout_ms: Some(10_000),
            log_preview_chars: 500,
            forward_response_headers: true,
            include_parse_error: true,
            detailed_errors: true,
        }
    }

    /// Minimal relay with no timeout, no header passthrough and terse errors.
    pub fn simple() -> Self {
        Self {
            allowed_domains: vec!["now.gg".to_string(), "api.now.gg".to_string()],
            domain_match: DomainMatch::Substring,
            default_headers: base_headers(None),
            stripped_headers: vec!["host".to_string(), "origin".to_string()],
            timeout_ms: None,
            log_preview_chars: 200,
            forward_response_headers: false,
            include_parse_error: false,
            detailed_errors: false,
        }
    }
}

impl RelayConfig {
    /// Effective outbound timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis)
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self::hardened()
    }
}

fn base_headers(user_agent: Option<&str>) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    headers.insert("Content-Type".to_string(), "application/json".to_string());
    headers.insert("Accept".to_string(), "application/json".to_string());
    if let Some(ua) = user_agent {
        headers.insert("User-Agent".to_string(), ua.to_string());
    }
    headers
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Length of one fixed window in seconds.
    pub window_secs: u64,

    /// Maximum requests per client per window.
    pub max_requests: u32,

    /// Emit `RateLimit-*` headers.
    pub standard_headers: bool,

    /// How often expired windows are purged, in seconds.
    pub purge_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_secs: 15 * 60,
            max_requests: 100,
            standard_headers: true,
            purge_interval_secs: 60,
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable security headers.
    pub enable_headers: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
        }
    }
}

/// CORS configuration. Origins are always reflected.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    pub enabled: bool,
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allow_credentials: true,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable in development, JSON otherwise.
    #[default]
    Auto,
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Auto,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
