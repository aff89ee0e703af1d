//! Per-client limit storage.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     sqlite.rs (read client_limits table)
//!     → apply_limits (validate each row)
//!     → RateLimiter::set_custom_limit
//! ```
//!
//! # Design Decisions
//! - Read once at startup; the limiter never writes back
//! - A failed load leaves every client on the default limit

pub mod sqlite;

use crate::security::RateLimiter;

pub use sqlite::SqliteStore;

/// A dedicated limit for one client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientLimit {
    pub client_id: String,
    pub capacity: u32,
    /// Minutes between refills.
    pub refill_rate: u32,
}

impl ClientLimit {
    pub fn new(client_id: impl Into<String>, capacity: u32, refill_rate: u32) -> Self {
        Self {
            client_id: client_id.into(),
            capacity,
            refill_rate,
        }
    }
}

/// Errors from a limit store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid row for client '{client_id}': {reason}")]
    InvalidRow { client_id: String, reason: String },
}

/// Source of per-client limits.
pub trait LimitStore: Send + Sync {
    fn load(&self) -> Result<Vec<ClientLimit>, StoreError>;
}

/// Install every usable limit into the limiter. Rows with a zero capacity
/// or refill rate are skipped. Returns the number installed.
pub fn apply_limits(limiter: &RateLimiter, limits: &[ClientLimit]) -> usize {
    let mut installed = 0;
    for limit in limits {
        if limit.capacity == 0 || limit.refill_rate == 0 {
            tracing::warn!(
                client = %limit.client_id,
                capacity = limit.capacity,
                refill_rate = limit.refill_rate,
                "Skipping custom limit with zero capacity or refill rate"
            );
            continue;
        }
        limiter.set_custom_limit(&limit.client_id, limit.capacity, limit.refill_rate);
        installed += 1;
    }
    installed
}

/// Load limits from `store` and install them. Failures are logged and
/// leave the limiter on defaults.
pub fn prime_limiter(limiter: &RateLimiter, store: &dyn LimitStore) -> usize {
    match store.load() {
        Ok(limits) => {
            let installed = apply_limits(limiter, &limits);
            tracing::info!(installed, total = limits.len(), "Custom client limits loaded");
            installed
        }
        Err(e) => {
            tracing::error!(error = %e, "Could not load custom client limits, using defaults");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingStore;

    impl LimitStore for FailingStore {
        fn load(&self) -> Result<Vec<ClientLimit>, StoreError> {
            Err(StoreError::InvalidRow {
                client_id: "x".into(),
                reason: "broken".into(),
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_apply_skips_unusable_rows() {
        let limiter = RateLimiter::new(10, 1);
        let limits = vec![
            ClientLimit::new("10.0.0.1", 2, 1),
            ClientLimit::new("10.0.0.2", 0, 1),
            ClientLimit::new("10.0.0.3", 5, 0),
        ];

        assert_eq!(apply_limits(&limiter, &limits), 1);
        assert_eq!(limiter.len(), 1);
        assert_eq!(limiter.bucket("10.0.0.1").unwrap().capacity(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_load_keeps_defaults() {
        let limiter = RateLimiter::new(10, 1);

        assert_eq!(prime_limiter(&limiter, &FailingStore), 0);
        assert!(limiter.is_empty());
        assert!(limiter.allow("anyone"));
        assert_eq!(limiter.bucket("anyone").unwrap().capacity(), 10);
    }
}
