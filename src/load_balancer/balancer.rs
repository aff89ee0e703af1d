//! Backend selector with liveness tracking.
//!
//! # Responsibilities
//! - Own the ordered backend list and the round-robin cursor
//! - Hand out the next live backend to request handlers
//! - Apply health sweep results
//! - Own the periodic sweep task
//!
//! # Design Decisions
//! - One mutex guards the cursor and every live flag
//! - Probes run outside the lock; results are applied in one step
//! - The sweep task holds a weak reference, so dropping the balancer ends it

use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::Duration;
use futures_util::future::join_all;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use url::Url;

use crate::health::active::{HealthMonitor, Prober};
use crate::load_balancer::{BackendSelector, BalancerError, backend::Backend, round_robin::RoundRobin};
use crate::observability::metrics;

/// Round-robin balancer over health-checked backends.
#[derive(Debug)]
pub struct Balancer {
    ring: Mutex<RoundRobin>,
    prober: Prober,
    monitor: OnceLock<JoinHandle<()>>,
}

impl Balancer {
    /// Build a balancer from configured addresses without probing them.
    ///
    /// Fails on the first address that cannot be used as a backend.
    pub fn new<S: AsRef<str>>(addresses: &[S], prober: Prober) -> Result<Self, BalancerError> {
        let backends = addresses
            .iter()
            .map(|raw| Backend::parse(raw.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            ring: Mutex::new(RoundRobin::new(backends)),
            prober,
            monitor: OnceLock::new(),
        })
    }

    /// Build a balancer, run one full health sweep, then keep sweeping
    /// every `interval` until `shutdown` fires.
    pub async fn start<S: AsRef<str>>(
        addresses: &[S],
        prober: Prober,
        interval: Duration,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<Arc<Self>, BalancerError> {
        let balancer = Arc::new(Self::new(addresses, prober)?);
        balancer.check_all().await;

        let monitor = HealthMonitor::new(Arc::downgrade(&balancer), interval);
        let handle = tokio::spawn(monitor.run(shutdown));
        let _ = balancer.monitor.set(handle);

        tracing::info!(
            backends = balancer.len(),
            live = balancer.live_count(),
            interval_secs = interval.as_secs(),
            "Balancer started"
        );
        Ok(balancer)
    }

    /// Next live backend in round-robin order, or `None` if every backend
    /// is down.
    pub fn next_url(&self) -> Option<Url> {
        self.ring().next_live()
    }

    /// Probe every backend concurrently and record the results.
    pub async fn check_all(&self) {
        let targets: Vec<Url> = self
            .ring()
            .backends()
            .iter()
            .map(|b| b.address().clone())
            .collect();

        let results = join_all(targets.iter().map(|url| self.prober.probe(url))).await;

        let mut ring = self.ring();
        for (backend, live) in ring.backends_mut().iter_mut().zip(results) {
            if backend.is_live() != live {
                tracing::info!(backend = %backend.address(), live, "Backend liveness changed");
            }
            backend.set_live(live);
            metrics::record_backend_health(backend.address().as_str(), live);
        }
    }

    /// Override a backend's liveness by position. Returns `false` if
    /// `index` is out of range.
    pub fn set_live(&self, index: usize, live: bool) -> bool {
        match self.ring().backends_mut().get_mut(index) {
            Some(backend) => {
                backend.set_live(live);
                true
            }
            None => false,
        }
    }

    /// Copy of the current backend states, in traversal order.
    pub fn backends(&self) -> Vec<Backend> {
        self.ring().backends().to_vec()
    }

    pub fn len(&self) -> usize {
        self.ring().backends().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn live_count(&self) -> usize {
        self.ring().backends().iter().filter(|b| b.is_live()).count()
    }

    /// Whether the periodic sweep task is running.
    pub fn is_monitoring(&self) -> bool {
        self.monitor.get().is_some_and(|handle| !handle.is_finished())
    }

    fn ring(&self) -> MutexGuard<'_, RoundRobin> {
        self.ring.lock().expect("balancer mutex poisoned")
    }
}

impl BackendSelector for Balancer {
    fn next_url(&self) -> Option<Url> {
        Balancer::next_url(self)
    }
}

impl Drop for Balancer {
    fn drop(&mut self) {
        if let Some(handle) = self.monitor.get() {
            handle.abort();
        }
    }
}
