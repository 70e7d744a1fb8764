//! Relay failures and their JSON error bodies.
//!
//! Validation failures (400/403) carry only an `error` field. Everything
//! that goes wrong after validation is reported as a 500 "Proxy request
//! failed" with the failure text in `message`; detailed mode adds a
//! machine-readable `code` and `type`.

use std::error::Error as StdError;
use std::time::Duration;

use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;

const PROXY_FAILED: &str = "Proxy request failed";

const DNS_SUGGESTION: &str = "The API endpoint could not be found. This may indicate the API is \
     not publicly accessible or requires authentication/IP whitelisting.";

/// Why an outbound call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    DnsResolution,
    Connect,
    Timeout,
    Body,
    Request,
}

impl FailureKind {
    /// Classify a client error. DNS failures are recognized from the error
    /// chain since the client reports them as generic connect errors.
    pub fn classify(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            FailureKind::Timeout
        } else if is_dns_failure(err) {
            FailureKind::DnsResolution
        } else if err.is_connect() {
            FailureKind::Connect
        } else if err.is_body() || err.is_decode() {
            FailureKind::Body
        } else {
            FailureKind::Request
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            FailureKind::DnsResolution => "DNS_RESOLUTION_FAILED",
            FailureKind::Connect => "CONNECTION_FAILED",
            FailureKind::Timeout => "TIMEOUT",
            FailureKind::Body => "BODY_READ_FAILED",
            FailureKind::Request => "REQUEST_FAILED",
        }
    }

    pub fn error_type(self) -> &'static str {
        match self {
            FailureKind::DnsResolution | FailureKind::Connect => "network",
            FailureKind::Timeout => "timeout",
            FailureKind::Body => "body",
            FailureKind::Request => "request",
        }
    }
}

/// Messages resolver failures surface with. hyper-util's `HttpConnector`
/// wraps them as "dns error", and the getaddrinfo-backed `io::Error`
/// underneath reads "failed to lookup address information". Neither error
/// type is public, so the chain is matched by text.
const DNS_FAILURE_MARKERS: [&str; 2] = ["dns error", "failed to lookup address"];

fn is_dns_failure(err: &reqwest::Error) -> bool {
    err.source().is_some_and(chain_mentions_dns)
}

fn chain_mentions_dns(err: &(dyn StdError + 'static)) -> bool {
    let mut source = Some(err);
    while let Some(cause) = source {
        let text = cause.to_string();
        if DNS_FAILURE_MARKERS.iter().any(|marker| text.contains(marker)) {
            return true;
        }
        source = cause.source();
    }
    false
}

/// Render an error and all of its causes as one line.
pub fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

/// An outbound call or upstream body read that failed.
#[derive(Debug, Error)]
#[error("request to {url} failed: {}", error_chain(.source))]
pub struct UpstreamError {
    pub url: String,
    pub kind: FailureKind,
    #[source]
    pub source: reqwest::Error,
}

impl UpstreamError {
    pub fn new(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self {
            url: url.into(),
            kind: FailureKind::classify(&source),
            source,
        }
    }
}

/// Every way a relay invocation can fail.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("URL is required")]
    MissingUrl,

    #[error("Invalid JSON body: {0}")]
    MalformedBody(#[source] serde_json::Error),

    #[error("Domain not allowed: {host}")]
    DomainNotAllowed { host: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid HTTP method: {0:?}")]
    InvalidMethod(String),

    #[error("Invalid header {name:?}")]
    InvalidHeader { name: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("Request timed out after {}s", .0.as_secs_f64())]
    DeadlineExceeded(Duration),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            RelayError::MissingUrl | RelayError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            RelayError::DomainNotAllowed { .. } => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Errors caused by the caller's input rather than the relay or upstream.
    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }

    pub fn code(&self) -> &'static str {
        match self {
            RelayError::MissingUrl => "URL_REQUIRED",
            RelayError::MalformedBody(_) => "INVALID_BODY",
            RelayError::DomainNotAllowed { .. } => "DOMAIN_NOT_ALLOWED",
            RelayError::InvalidUrl(_) => "INVALID_URL",
            RelayError::InvalidMethod(_) => "INVALID_METHOD",
            RelayError::InvalidHeader { .. } => "INVALID_HEADER",
            RelayError::Client(_) => "CLIENT_INIT_FAILED",
            RelayError::Upstream(e) => e.kind.code(),
            RelayError::DeadlineExceeded(_) => FailureKind::Timeout.code(),
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            RelayError::Upstream(e) => e.kind.error_type(),
            RelayError::DeadlineExceeded(_) => FailureKind::Timeout.error_type(),
            RelayError::Client(_) => "internal",
            _ => "validation",
        }
    }

    /// Build the JSON body returned to the caller.
    pub fn to_body(&self, detailed: bool) -> ErrorBody {
        match self {
            RelayError::MissingUrl => ErrorBody::short("URL is required"),
            RelayError::DomainNotAllowed { .. } => ErrorBody::short("Domain not allowed"),
            RelayError::MalformedBody(e) => ErrorBody {
                message: Some(e.to_string()),
                ..ErrorBody::short("Invalid JSON body")
            },
            _ => {
                let message = match self {
                    RelayError::Upstream(e) => e.to_string(),
                    other => other.to_string(),
                };
                let mut body = ErrorBody {
                    message: Some(message),
                    ..ErrorBody::short(PROXY_FAILED)
                };
                if detailed {
                    body.code = Some(self.code());
                    body.kind = Some(self.error_type());
                    if matches!(self, RelayError::Upstream(e) if e.kind == FailureKind::DnsResolution)
                    {
                        body.suggestion = Some(DNS_SUGGESTION);
                    }
                }
                body
            }
        }
    }
}

/// JSON error response body.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<&'static str>,
}

impl ErrorBody {
    pub fn short(error: &'static str) -> Self {
        Self {
            error,
            message: None,
            code: None,
            kind: None,
            suggestion: None,
        }
    }
}
