//! Round-robin HTTP load balancer with per-client rate limiting.

pub mod config;
pub mod http;
pub mod health;
pub mod load_balancer;
pub mod lifecycle;
pub mod observability;
pub mod security;
pub mod store;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::{App, Shutdown};
pub use load_balancer::{BackendSelector, Balancer};
pub use security::{Admission, RateLimiter, TokenBucket};
