//! Per-client rate limiting.
//!
//! Buckets are created on a client's first request, replaced when a
//! custom limit is installed and torn down together on shutdown. Each
//! bucket owns a refill task, so every path that drops a bucket from the
//! map clears it first.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use crate::observability::metrics;
use crate::security::bucket::TokenBucket;

/// Admission decision for one request.
pub trait Admission: Send + Sync {
    /// Returns `true` if the client may proceed.
    fn allow(&self, client_id: &str) -> bool;
}

/// Token-bucket rate limiter keyed by client identifier.
#[derive(Debug)]
pub struct RateLimiter {
    buckets: RwLock<HashMap<String, Arc<TokenBucket>>>,
    default_capacity: u32,
    default_refill_rate: u32,
    active_refills: Arc<AtomicUsize>,
}

impl RateLimiter {
    /// Create an empty limiter. New clients get `default_capacity` tokens,
    /// refilled one every `default_refill_rate` minutes.
    pub fn new(default_capacity: u32, default_refill_rate: u32) -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
            default_capacity,
            default_refill_rate,
            active_refills: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Check the limit for a client, creating its bucket on first use.
    pub fn allow(&self, client_id: &str) -> bool {
        let bucket = match self.bucket(client_id) {
            Some(bucket) => bucket,
            None => self.get_or_insert(client_id),
        };
        bucket.allow()
    }

    /// Install a dedicated limit for a client, replacing any existing bucket.
    pub fn set_custom_limit(&self, client_id: &str, capacity: u32, refill_rate: u32) {
        let mut buckets = self.buckets.write().expect("rate limiter lock poisoned");
        let bucket = Arc::new(self.new_bucket(capacity, refill_rate));
        if let Some(previous) = buckets.insert(client_id.to_string(), bucket) {
            previous.clear();
        }
        metrics::set_rate_limit_buckets(buckets.len());

        tracing::debug!(
            client = %client_id,
            capacity,
            refill_rate,
            "Custom rate limit installed"
        );
    }

    /// Stop every refill task and forget all clients.
    pub fn clear(&self) {
        let mut buckets = self.buckets.write().expect("rate limiter lock poisoned");
        let count = buckets.len();
        for (_, bucket) in buckets.drain() {
            bucket.clear();
        }
        metrics::set_rate_limit_buckets(0);

        tracing::info!(buckets = count, "Rate limiter cleared");
    }

    /// The bucket currently assigned to a client, if any.
    pub fn bucket(&self, client_id: &str) -> Option<Arc<TokenBucket>> {
        let buckets = self.buckets.read().expect("rate limiter lock poisoned");
        buckets.get(client_id).cloned()
    }

    /// Number of clients with a bucket.
    pub fn len(&self) -> usize {
        self.buckets.read().expect("rate limiter lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of refill tasks that have not yet exited.
    ///
    /// A cleared bucket's task exits the next time the runtime polls it,
    /// so this can briefly lag behind [`RateLimiter::clear`].
    pub fn active_refills(&self) -> usize {
        self.active_refills.load(Ordering::SeqCst)
    }

    pub fn default_capacity(&self) -> u32 {
        self.default_capacity
    }

    pub fn default_refill_rate(&self) -> u32 {
        self.default_refill_rate
    }

    fn get_or_insert(&self, client_id: &str) -> Arc<TokenBucket> {
        let mut buckets = self.buckets.write().expect("rate limiter lock poisoned");
        // Another request may have created it between our read and write lock.
        if let Some(bucket) = buckets.get(client_id) {
            return bucket.clone();
        }

        let bucket = Arc::new(self.new_bucket(self.default_capacity, self.default_refill_rate));
        buckets.insert(client_id.to_string(), bucket.clone());
        metrics::set_rate_limit_buckets(buckets.len());

        tracing::debug!(client = %client_id, "Created rate limit bucket");
        bucket
    }

    fn new_bucket(&self, capacity: u32, refill_rate: u32) -> TokenBucket {
        TokenBucket::tracked(capacity, refill_rate, self.active_refills.clone())
    }
}

impl Admission for RateLimiter {
    fn allow(&self, client_id: &str) -> bool {
        RateLimiter::allow(self, client_id)
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        if let Ok(buckets) = self.buckets.get_mut() {
            for bucket in buckets.values() {
                bucket.clear();
            }
        }
    }
}
