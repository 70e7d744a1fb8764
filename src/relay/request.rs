//! Caller-supplied forward request.

use std::collections::BTreeMap;

use axum::http::Method;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::relay::error::RelayError;

/// Method used when the caller omits one.
pub const DEFAULT_METHOD: &str = "POST";

/// Body of `POST /api/proxy`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ForwardRequest {
    /// Absolute upstream URL.
    #[serde(default)]
    pub url: Option<String>,

    /// HTTP method, `POST` when omitted.
    #[serde(default)]
    pub method: Option<String>,

    /// JSON payload. Ignored for `GET`.
    #[serde(default)]
    pub body: Option<Value>,

    /// Extra outbound headers; these override the defaults.
    #[serde(default, deserialize_with = "null_as_default")]
    pub headers: BTreeMap<String, String>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl ForwardRequest {
    /// Parse a raw request body. An empty body reads as `{}`.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, RelayError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(bytes).map_err(RelayError::MalformedBody)
    }

    /// The target URL, if present and non-empty.
    pub fn target(&self) -> Result<&str, RelayError> {
        match self.url.as_deref() {
            Some(url) if !url.trim().is_empty() => Ok(url.trim()),
            _ => Err(RelayError::MissingUrl),
        }
    }

    /// Upper-cased method.
    pub fn method(&self) -> Result<Method, RelayError> {
        let raw = self.method.as_deref().unwrap_or(DEFAULT_METHOD);
        let upper = raw.trim().to_ascii_uppercase();
        Method::from_bytes(upper.as_bytes()).map_err(|_| RelayError::InvalidMethod(raw.to_string()))
    }

    /// Serialized body for the outbound call, or `None` for `GET` or when
    /// no body was given.
    pub fn outbound_body(&self, method: &Method) -> Result<Option<String>, RelayError> {
        if method == Method::GET {
            return Ok(None);
        }
        match &self.body {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::to_string(value)
                .map(Some)
                .map_err(RelayError::MalformedBody),
        }
    }
}
