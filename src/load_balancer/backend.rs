//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server
//! - Validate its address at construction
//! - Track liveness as last reported by a health probe

use url::Url;

use crate::load_balancer::BalancerError;

/// A single backend server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backend {
    /// Target address (scheme + host, optional base path).
    address: Url,
    /// Result of the most recent probe. Starts out `true`.
    live: bool,
}

impl Backend {
    /// Parse a configured backend address.
    ///
    /// Only `http` and `https` targets with a host are accepted.
    pub fn parse(raw: &str) -> Result<Self, BalancerError> {
        let address = Url::parse(raw).map_err(|source| BalancerError::InvalidAddress {
            address: raw.to_string(),
            source,
        })?;

        if !matches!(address.scheme(), "http" | "https") {
            return Err(BalancerError::UnsupportedAddress {
                address: raw.to_string(),
                reason: format!("unsupported scheme '{}'", address.scheme()),
            });
        }
        if address.host_str().is_none() {
            return Err(BalancerError::UnsupportedAddress {
                address: raw.to_string(),
                reason: "missing host".to_string(),
            });
        }

        Ok(Self::new(address))
    }

    pub fn new(address: Url) -> Self {
        Self { address, live: true }
    }

    pub fn address(&self) -> &Url {
        &self.address
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub(crate) fn set_live(&mut self, live: bool) {
        self.live = live;
    }
}
