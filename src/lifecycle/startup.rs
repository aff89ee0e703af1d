//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Start background tasks (health sweep, metrics)
//! - Load custom client limits
//! - Tear everything down once the server stops
//!
//! # Design Decisions
//! - Fail fast: an unusable backend address is fatal
//! - A missing or broken limit store is not fatal
//! - Listeners start last (traffic only when the first sweep is done)

use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use crate::config::ProxyConfig;
use crate::health::Prober;
use crate::http::HttpServer;
use crate::lifecycle::Shutdown;
use crate::load_balancer::{Balancer, BalancerError};
use crate::observability::metrics;
use crate::security::RateLimiter;
use crate::store::{SqliteStore, prime_limiter};

/// Errors that abort startup.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Balancer(#[from] BalancerError),
}

/// The running core: balancer, limiter and the shutdown coordinator
/// their background tasks listen to.
pub struct App {
    config: ProxyConfig,
    balancer: Arc<Balancer>,
    limiter: Arc<RateLimiter>,
    shutdown: Shutdown,
}

impl App {
    /// Build every subsystem. Returns after the first health sweep.
    pub async fn bootstrap(config: ProxyConfig) -> Result<Self, StartupError> {
        let shutdown = Shutdown::new();

        if config.observability.metrics_enabled {
            match config.observability.metrics_address.parse() {
                Ok(addr) => metrics::init_metrics(addr),
                Err(_) => tracing::error!(
                    metrics_address = %config.observability.metrics_address,
                    "Failed to parse metrics address"
                ),
            }
        }

        let prober = Prober::new(
            config.health_check.path.clone(),
            Duration::from_secs(config.health_check.timeout_secs),
        );
        let balancer = Balancer::start(
            config.backends.as_slice(),
            prober,
            Duration::from_secs(config.health_check.interval_secs),
            shutdown.subscribe(),
        )
        .await?;

        let limiter = Arc::new(RateLimiter::new(
            config.rate_limit.default_capacity,
            config.rate_limit.default_refill_rate,
        ));
        tracing::info!(
            default_capacity = limiter.default_capacity(),
            default_refill_rate = limiter.default_refill_rate(),
            "Rate limiter ready"
        );

        if let Some(path) = &config.storage.path {
            match SqliteStore::open(path) {
                Ok(store) => {
                    prime_limiter(&limiter, &store);
                }
                Err(e) => {
                    tracing::error!(path = %path, error = %e, "Could not open limit store, using defaults");
                }
            }
        }

        Ok(Self {
            config,
            balancer,
            limiter,
            shutdown,
        })
    }

    pub fn balancer(&self) -> &Arc<Balancer> {
        &self.balancer
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Handle used to request shutdown from outside.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Serve traffic until shutdown, then stop every background task.
    pub async fn serve(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let server = HttpServer::new(
            self.balancer.clone(),
            self.limiter.clone(),
            &self.config.timeouts,
        );
        let result = server.run(listener, self.shutdown.subscribe()).await;
        self.stop();
        result
    }

    /// Cancel the health sweep and every refill task.
    pub fn stop(&self) {
        tracing::info!("Stopping health monitor");
        self.shutdown.trigger();

        tracing::info!("Clearing rate limiter");
        self.limiter.clear();
        tracing::info!(remaining = self.limiter.active_refills(), "Refill tasks signalled to stop");
    }
}
