//! Security response headers.
//!
//! # Responsibilities
//! - Add the usual hardening headers to every response
//! - Leave headers already set by a handler untouched, so relayed upstream
//!   headers win
//!
//! Content-Security-Policy and Cross-Origin-Embedder-Policy are not set.

use axum::{
    http::{HeaderName, HeaderValue},
    response::Response,
};

/// Header set applied by [`security_headers`].
pub const SECURITY_HEADERS: &[(&str, &str)] = &[
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-origin"),
    ("origin-agent-cluster", "?1"),
    ("referrer-policy", "no-referrer"),
    ("strict-transport-security", "max-age=15552000; includeSubDomains"),
    ("x-content-type-options", "nosniff"),
    ("x-dns-prefetch-control", "off"),
    ("x-download-options", "noopen"),
    ("x-frame-options", "SAMEORIGIN"),
    ("x-permitted-cross-domain-policies", "none"),
    ("x-xss-protection", "0"),
];

/// Response mapper adding [`SECURITY_HEADERS`] where absent.
pub async fn security_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    for (name, value) in SECURITY_HEADERS {
        let name = HeaderName::from_static(name);
        if !headers.contains_key(&name) {
            headers.insert(name, HeaderValue::from_static(value));
        }
    }
    response
}
