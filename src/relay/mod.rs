//! Relay subsystem.
//!
//! # Data Flow
//! ```text
//! ForwardRequest (request.rs)
//!     → url present? parse → allowlist.rs (host policy)
//!     → headers.rs (defaults + caller overrides, strip host/origin/referer)
//!     → client.rs (single outbound call, bounded timeout)
//!     → response.rs (JSON passthrough or raw-text wrapper, header filter)
//!     → ForwardResponse
//!
//! Any failure → error.rs (RelayError → status + JSON body)
//! ```
//!
//! # Design Decisions
//! - Validation failures never reach the network
//! - No retries: one best-effort attempt per invocation
//! - Upstream status is echoed verbatim, never reinterpreted
//! - A non-JSON upstream body is wrapped, not treated as a failure

pub mod allowlist;
pub mod client;
pub mod error;
pub mod headers;
pub mod request;
pub mod response;

pub use allowlist::DomainPolicy;
pub use client::Relay;
pub use error::{ErrorBody, FailureKind, RelayError, UpstreamError};
pub use request::ForwardRequest;
pub use response::{ForwardResponse, RelayBody};
