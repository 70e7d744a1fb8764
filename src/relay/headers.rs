//! Outbound header construction and upstream header filtering.

use std::collections::BTreeMap;

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

use crate::config::RelayConfig;
use crate::relay::error::RelayError;

/// Upstream response headers that describe the upstream connection's
/// framing and must not be replayed on ours.
pub const EXCLUDED_RESPONSE_HEADERS: &[&str] = &["content-encoding", "transfer-encoding", "connection"];

/// Merge defaults with caller headers and strip the configured names.
///
/// Caller values replace defaults with the same name (names compare
/// case-insensitively). Stripping happens last, so a stripped header never
/// reaches upstream whichever side supplied it.
pub fn build_outbound_headers(
    config: &RelayConfig,
    caller: &BTreeMap<String, String>,
) -> Result<HeaderMap, RelayError> {
    let mut headers = HeaderMap::new();

    for (name, value) in config.default_headers.iter().chain(caller.iter()) {
        let (name, value) = parse_header(name, value)?;
        headers.insert(name, value);
    }

    for name in &config.stripped_headers {
        if let Ok(name) = HeaderName::from_bytes(name.trim().as_bytes()) {
            headers.remove(name);
        }
    }

    Ok(headers)
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), RelayError> {
    let invalid = || RelayError::InvalidHeader {
        name: name.to_string(),
    };
    let header_name = HeaderName::from_bytes(name.trim().as_bytes()).map_err(|_| invalid())?;
    let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
    Ok((header_name, header_value))
}

/// Copy upstream headers for the relay response.
///
/// Drops [`EXCLUDED_RESPONSE_HEADERS`] plus `content-length` and
/// `content-type`, which belong to the re-serialized JSON body.
pub fn filter_response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(upstream.len());
    for (name, value) in upstream {
        let excluded = EXCLUDED_RESPONSE_HEADERS
            .iter()
            .any(|h| name.as_str().eq_ignore_ascii_case(h));
        if excluded || name == header::CONTENT_LENGTH || name == header::CONTENT_TYPE {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}
