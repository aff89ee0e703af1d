//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges and addresses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;
use crate::config::schema::ProxyConfig;
use crate::load_balancer::Backend;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    BindAddress(String),
    #[error("{0}")]
    Backend(String),
    #[error("rate_limit.default_capacity must be greater than zero")]
    ZeroCapacity,
    #[error("rate_limit.default_refill_rate must be greater than zero")]
    ZeroRefillRate,
    #[error("health_check.{0} must be greater than zero")]
    ZeroHealthTiming(&'static str),
    #[error("timeouts.request_secs must be greater than zero")]
    ZeroRequestTimeout,
    #[error("health_check.path must start with '/', got '{0}'")]
    ProbePath(String),
    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    for raw in &config.backends {
        if let Err(e) = Backend::parse(raw) {
            errors.push(ValidationError::Backend(e.to_string()));
        }
    }

    if config.rate_limit.default_capacity == 0 {
        errors.push(ValidationError::ZeroCapacity);
    }
    if config.rate_limit.default_refill_rate == 0 {
        errors.push(ValidationError::ZeroRefillRate);
    }

    if config.health_check.interval_secs == 0 {
        errors.push(ValidationError::ZeroHealthTiming("interval_secs"));
    }
    if config.health_check.timeout_secs == 0 {
        errors.push(ValidationError::ZeroHealthTiming("timeout_secs"));
    }
    if !config.health_check.path.starts_with('/') {
        errors.push(ValidationError::ProbePath(config.health_check.path.clone()));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(config.observability.metrics_address.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = ProxyConfig::default();
        config.listener.bind_address = "nowhere".into();
        config.backends = vec!["http://ok:1".into(), "bogus".into(), "ftp://files:21".into()];
        config.rate_limit.default_capacity = 0;
        config.rate_limit.default_refill_rate = 0;
        config.health_check.interval_secs = 0;
        config.health_check.path = "ping".into();

        let errors = validate_config(&config).unwrap_err();

        assert_eq!(errors.len(), 7);
        assert_eq!(errors[0], ValidationError::BindAddress("nowhere".into()));
        assert!(matches!(errors[1], ValidationError::Backend(ref msg) if msg.contains("bogus")));
        assert!(matches!(errors[2], ValidationError::Backend(ref msg) if msg.contains("ftp")));
        assert!(errors.contains(&ValidationError::ZeroCapacity));
        assert!(errors.contains(&ValidationError::ZeroRefillRate));
        assert!(errors.contains(&ValidationError::ZeroHealthTiming("interval_secs")));
        assert!(errors.contains(&ValidationError::ProbePath("ping".into())));
    }

    #[test]
    fn test_https_backend_is_valid() {
        let mut config = ProxyConfig::default();
        config.backends = vec!["https://api.example.com".into(), "http://10.0.0.2:8080".into()];
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_zero_request_timeout_rejected() {
        let mut config = ProxyConfig::default();
        config.timeouts.request_secs = 0;
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::ZeroRequestTimeout]
        );
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = ProxyConfig::default();
        config.observability.metrics_address = "bad".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::MetricsAddress("bad".into())]
        );
    }
}
