//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID assigned or propagated)
//!     → deadline.rs (overall request timeout, JSON on expiry)
//!     → /api/* : rate limiter → proxy.rs (relay handler)
//!     → /health : health check
//!     → anything else : static_files.rs
//!     → security headers, CORS
//!     → Send to client
//! ```

pub mod deadline;
pub mod proxy;
pub mod request;
pub mod server;
pub mod static_files;

pub use request::{MakeRequestUuidV4, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
