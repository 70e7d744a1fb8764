//! API relay library.
//!
//! A small HTTP relay: `POST /api/proxy` forwards a caller-described
//! request to an allow-listed upstream and hands back its status and body,
//! so browser clients can reach APIs that do not send CORS headers.

pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod relay;
pub mod security;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use relay::{ForwardRequest, Relay, RelayError};
