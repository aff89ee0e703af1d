//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Balancer (first sweep) → RateLimiter → limit store → listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Stop health sweep → Clear limiter
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listeners
//! - No background task outlives shutdown

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::{App, StartupError};
