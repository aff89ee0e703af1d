//! Active health checking.
//!
//! # Responsibilities
//! - Probe a backend's liveness endpoint with a bounded timeout
//! - Periodically drive a full sweep of the balancer

use std::sync::Weak;
use std::time::Duration;
use axum::body::Body;
use axum::http::Request;
use tokio::sync::broadcast;
use tokio::time::{self, Instant, MissedTickBehavior};
use url::Url;

use crate::http::client::{UpstreamClient, upstream_client};
use crate::load_balancer::Balancer;

/// Default liveness path on every backend.
pub const DEFAULT_PROBE_PATH: &str = "/ping";

/// Default sweep interval, also used as the per-probe timeout.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Issues liveness requests against backends.
#[derive(Debug, Clone)]
pub struct Prober {
    client: UpstreamClient,
    path: String,
    timeout: Duration,
}

impl Prober {
    pub fn new(path: impl Into<String>, timeout: Duration) -> Self {
        let client = upstream_client();

        Self {
            client,
            path: path.into(),
            timeout,
        }
    }

    /// Returns `true` only if the backend answered with a 2xx status
    /// within the timeout.
    pub async fn probe(&self, base: &Url) -> bool {
        let target = probe_target(base, &self.path);

        let request = match Request::builder()
            .method("GET")
            .uri(target.as_str())
            .header("user-agent", "loadgate-health-check")
            .body(Body::empty())
        {
            Ok(req) => req,
            Err(e) => {
                tracing::warn!(backend = %base, error = %e, "Failed to build health check request");
                return false;
            }
        };

        match time::timeout(self.timeout, self.client.request(request)).await {
            Ok(Ok(response)) => {
                let success = response.status().is_success();
                if !success {
                    tracing::warn!(backend = %base, status = %response.status(), "Health check failed: non-success status");
                }
                success
            }
            Ok(Err(e)) => {
                tracing::warn!(backend = %base, error = %e, "Health check failed: connection error");
                false
            }
            Err(_) => {
                tracing::warn!(backend = %base, timeout = ?self.timeout, "Health check failed: timeout");
                false
            }
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for Prober {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_PATH, DEFAULT_SWEEP_INTERVAL)
    }
}

/// Append the probe path to a backend's base path.
fn probe_target(base: &Url, path: &str) -> Url {
    let mut target = base.clone();
    let joined = format!("{}{}", base.path().trim_end_matches('/'), path);
    target.set_path(&joined);
    target.set_query(None);
    target.set_fragment(None);
    target
}

/// Periodic sweep loop for one balancer.
pub struct HealthMonitor {
    balancer: Weak<Balancer>,
    interval: Duration,
}

impl HealthMonitor {
    pub fn new(balancer: Weak<Balancer>, interval: Duration) -> Self {
        Self { balancer, interval }
    }

    /// Sweep every `interval` until shutdown fires or the balancer is gone.
    /// The first sweep happens one interval after start.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Health monitor starting");

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let Some(balancer) = self.balancer.upgrade() else {
                        break;
                    };
                    // An abandoned sweep applies nothing.
                    let cancelled = tokio::select! {
                        _ = balancer.check_all() => false,
                        _ = shutdown.recv() => true,
                    };
                    if cancelled {
                        tracing::info!("Health monitor received shutdown signal during sweep, exiting loop");
                        break;
                    }
                    tracing::debug!(live = balancer.live_count(), total = balancer.len(), "Health sweep complete");
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_target_joins_paths() {
        let base = Url::parse("http://127.0.0.1:9001").unwrap();
        assert_eq!(probe_target(&base, "/ping").as_str(), "http://127.0.0.1:9001/ping");

        let nested = Url::parse("http://svc:80/api/?x=1").unwrap();
        assert_eq!(probe_target(&nested, "/ping").as_str(), "http://svc/api/ping");
    }

    #[test]
    fn test_default_prober() {
        let prober = Prober::default();
        assert_eq!(prober.path(), "/ping");
        assert_eq!(prober.timeout(), DEFAULT_SWEEP_INTERVAL);
    }
}
