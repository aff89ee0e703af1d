//! Round-robin selection over live backends.

use url::Url;
use crate::load_balancer::backend::Backend;

/// Ordered backends plus the round-robin cursor.
///
/// Invariant: `cursor < backends.len()` whenever `backends` is non-empty.
#[derive(Debug, Default)]
pub struct RoundRobin {
    backends: Vec<Backend>,
    cursor: usize,
}

impl RoundRobin {
    pub fn new(backends: Vec<Backend>) -> Self {
        Self { backends, cursor: 0 }
    }

    /// Return the next live backend's address, visiting each backend at
    /// most once. The cursor ends one past the last backend visited.
    pub fn next_live(&mut self) -> Option<Url> {
        let len = self.backends.len();
        for _ in 0..len {
            let index = self.cursor;
            self.cursor = (index + 1) % len;
            let backend = &self.backends[index];
            if backend.is_live() {
                return Some(backend.address().clone());
            }
        }
        None
    }

    pub fn backends(&self) -> &[Backend] {
        &self.backends
    }

    pub(crate) fn backends_mut(&mut self) -> &mut [Backend] {
        &mut self.backends
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(addresses: &[&str]) -> RoundRobin {
        RoundRobin::new(addresses.iter().map(|a| Backend::parse(a).unwrap()).collect())
    }

    fn host(url: Option<Url>) -> String {
        url.unwrap().host_str().unwrap().to_string()
    }

    #[test]
    fn test_round_robin() {
        let mut rr = ring(&["http://a", "http://b", "http://c"]);

        assert_eq!(host(rr.next_live()), "a");
        assert_eq!(host(rr.next_live()), "b");
        assert_eq!(host(rr.next_live()), "c");
        assert_eq!(host(rr.next_live()), "a");
    }

    #[test]
    fn test_each_live_backend_once_per_cycle_from_cursor() {
        let mut rr = ring(&["http://a", "http://b", "http://c", "http://d"]);
        rr.next_live();
        assert_eq!(rr.cursor(), 1);

        let cycle: Vec<String> = (0..4).map(|_| host(rr.next_live())).collect();
        assert_eq!(cycle, ["b", "c", "d", "a"]);
    }

    #[test]
    fn test_skips_dead_backends() {
        let mut rr = ring(&["http://a", "http://b", "http://c"]);
        rr.backends_mut()[1].set_live(false);

        assert_eq!(host(rr.next_live()), "a");
        assert_eq!(host(rr.next_live()), "c");
        assert_eq!(host(rr.next_live()), "a");
    }

    #[test]
    fn test_all_dead_returns_none() {
        let mut rr = ring(&["http://a", "http://b"]);
        for backend in rr.backends_mut() {
            backend.set_live(false);
        }

        assert!(rr.next_live().is_none());
        assert!(rr.next_live().is_none());
        assert!(rr.cursor() < 2);
    }

    #[test]
    fn test_empty_ring() {
        let mut rr = RoundRobin::default();
        assert!(rr.next_live().is_none());
        assert_eq!(rr.cursor(), 0);
    }

    #[test]
    fn test_recovered_backend_rejoins_rotation() {
        let mut rr = ring(&["http://a", "http://b"]);
        rr.backends_mut()[0].set_live(false);
        assert_eq!(host(rr.next_live()), "b");
        assert_eq!(host(rr.next_live()), "b");

        rr.backends_mut()[0].set_live(true);
        assert_eq!(host(rr.next_live()), "a");
        assert_eq!(host(rr.next_live()), "b");
    }
}
