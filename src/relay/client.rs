//! The relay pipeline: validate, sanitize headers, forward, shape.

use url::Url;

use crate::config::RelayConfig;
use crate::relay::allowlist::DomainPolicy;
use crate::relay::error::{RelayError, UpstreamError};
use crate::relay::headers::{build_outbound_headers, filter_response_headers};
use crate::relay::request::ForwardRequest;
use crate::relay::response::{preview, ForwardResponse, RelayBody};

/// Forwards caller requests to allow-listed upstreams.
///
/// Holds no per-request state; one instance is shared by all handlers.
pub struct Relay {
    client: reqwest::Client,
    policy: DomainPolicy,
    config: RelayConfig,
}

impl Relay {
    /// Build the outbound client and domain policy.
    ///
    /// The client never consults system proxy settings, so every call goes
    /// straight to the upstream host.
    pub fn new(config: RelayConfig) -> Result<Self, RelayError> {
        let mut builder = reqwest::Client::builder().no_proxy();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(RelayError::Client)?;
        let policy = DomainPolicy::new(&config.allowed_domains, config.domain_match);

        Ok(Self {
            client,
            policy,
            config,
        })
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn policy(&self) -> &DomainPolicy {
        &self.policy
    }

    /// Run one relay invocation. Makes at most one outbound call and none
    /// when validation fails.
    pub async fn forward(&self, request: ForwardRequest) -> Result<ForwardResponse, RelayError> {
        tracing::debug!(
            url = ?request.url,
            method = ?request.method,
            headers = ?request.headers.keys().collect::<Vec<_>>(),
            has_body = request.body.is_some(),
            "Relay request received"
        );

        let url = Url::parse(request.target()?)?;
        let host = url.host_str().unwrap_or_default();
        if !self.policy.permits(host) {
            tracing::warn!(host = %host, "Domain not allowed");
            return Err(RelayError::DomainNotAllowed {
                host: host.to_string(),
            });
        }

        let method = request.method()?;
        let headers = build_outbound_headers(&self.config, &request.headers)?;
        let body = request.outbound_body(&method)?;

        tracing::info!(method = %method, url = %url, "Proxying request");

        let mut outbound = self
            .client
            .request(method, url.clone())
            .headers(headers);
        if let Some(body) = body {
            outbound = outbound.body(body);
        }

        let response = outbound
            .send()
            .await
            .map_err(|e| UpstreamError::new(url.as_str(), e))?;

        let status = response.status();
        let upstream_headers = response.headers().clone();
        let text = response
            .text()
            .await
            .map_err(|e| UpstreamError::new(url.as_str(), e))?;

        tracing::info!(status = status.as_u16(), bytes = text.len(), "Upstream responded");
        tracing::debug!(
            headers = ?upstream_headers,
            body = %preview(&text, self.config.log_preview_chars),
            "Upstream response"
        );

        let body = RelayBody::from_text(text, self.config.include_parse_error);
        let headers = if self.config.forward_response_headers {
            filter_response_headers(&upstream_headers)
        } else {
            Default::default()
        };

        Ok(ForwardResponse {
            status,
            body,
            headers,
        })
    }
}
