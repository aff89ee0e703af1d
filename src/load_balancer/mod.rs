//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Request admitted
//!     → balancer.rs (lock, select)
//!     → round_robin.rs (rotate past dead backends)
//!     → backend.rs (address + liveness)
//!     → Return backend URL or None
//!
//! Health sweep (health::active):
//!     → balancer.rs (snapshot addresses, probe, apply results)
//! ```
//!
//! # Design Decisions
//! - Backends are fixed at startup; only liveness changes
//! - Selection never waits on I/O
//! - No live backend is a normal outcome, not an error

pub mod backend;
pub mod balancer;
pub mod round_robin;

use url::Url;

pub use backend::Backend;
pub use balancer::Balancer;

/// Picks the backend for the next request.
pub trait BackendSelector: Send + Sync {
    /// The next backend address, or `None` when no backend is available.
    fn next_url(&self) -> Option<Url>;
}

/// Errors raised while building a balancer.
#[derive(Debug, thiserror::Error)]
pub enum BalancerError {
    #[error("invalid backend address '{address}': {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unusable backend address '{address}': {reason}")]
    UnsupportedAddress { address: String, reason: String },
}
