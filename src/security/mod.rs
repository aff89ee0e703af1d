//! Admission control subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (look up or create the client's bucket)
//!     → bucket.rs (take a token, or deny)
//!     → Pass to load balancing when admitted
//!
//! In the background:
//!     bucket.rs refill task adds one token per period
//! ```
//!
//! # Design Decisions
//! - One bucket and one refill task per client identifier
//! - Map lock and bucket locks are independent
//! - Rejected requests never reach the balancer

pub mod bucket;
pub mod headers;
pub mod rate_limit;

pub use bucket::TokenBucket;
pub use rate_limit::{Admission, RateLimiter};
