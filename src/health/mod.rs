//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer
//!     → Probe every backend concurrently
//!     → Balancer applies all results at once
//! ```
//!
//! # Design Decisions
//! - One probe failure marks a backend down; one success brings it back
//! - Each probe has its own timeout so a hung backend cannot stall the sweep
//! - Probe outcomes are bookkeeping, never errors for callers

pub mod active;

pub use active::{HealthMonitor, Prober};
