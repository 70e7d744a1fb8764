//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (per-client fixed window on /api/*)
//!     → handler
//!     → headers.rs (hardening headers on the way out)
//! ```
//!
//! # Design Decisions
//! - Rate limit counters sit behind a store trait
//! - Security headers never override what a handler set

pub mod headers;
pub mod rate_limit;

pub use headers::security_headers;
pub use rate_limit::{
    rate_limit_middleware, spawn_purge_task, InMemoryStore, RateLimitStore, RateLimiter,
};
