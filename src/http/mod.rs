//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, timeout)
//!     → [rate limiter admits or rejects]   → 429
//!     → [balancer picks a live backend]    → 503 if none
//!     → request.rs (rewrite URI)
//!     → response.rs (tag response, render errors)
//!     → Send to client
//! ```

pub mod client;
pub mod request;
pub mod response;
pub mod server;

pub use client::{UpstreamClient, upstream_client};
pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use response::{ErrorBody, X_LOAD_BALANCER};
pub use server::HttpServer;
