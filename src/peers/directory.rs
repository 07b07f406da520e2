use crate::peers::PeerAddr;
use log::{info, warn};
use std::collections::BTreeMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Default)]
struct PeerHealth {
    last_success: Option<Instant>,
    consecutive_failures: u32,
    retry_after: Option<Instant>,
}

/// De-duplicated set of known peers.
///
/// Peers are never removed. A peer that fails `failure_threshold` times in a
/// row is skipped by `reachable` for `cooldown`, then tried again; one more
/// failure starts a new cool-down, one success clears it.
pub struct PeerDirectory {
    inner: RwLock<BTreeMap<PeerAddr, PeerHealth>>,
    failure_threshold: u32,
    cooldown: Duration,
}

impl Default for PeerDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl PeerDirectory {
    pub fn new() -> PeerDirectory {
        Self::with_policy(DEFAULT_FAILURE_THRESHOLD, DEFAULT_COOLDOWN)
    }

    pub fn with_policy(failure_threshold: u32, cooldown: Duration) -> PeerDirectory {
        PeerDirectory {
            inner: RwLock::new(BTreeMap::new()),
            failure_threshold: failure_threshold.max(1),
            cooldown,
        }
    }

    /// Idempotent; returns true when the address was not known before.
    pub fn register(&self, addr: PeerAddr) -> bool {
        let mut inner = self
            .inner
            .write()
            .expect("Failed to acquire write lock on peers - this should never happen");
        if inner.contains_key(&addr) {
            return false;
        }
        info!("Registered peer {addr}");
        inner.insert(addr, PeerHealth::default());
        true
    }

    /// Snapshot of every known peer, in address order.
    pub fn all(&self) -> Vec<PeerAddr> {
        self.inner
            .read()
            .expect("Failed to acquire read lock on peers - this should never happen")
            .keys()
            .cloned()
            .collect()
    }

    /// Known peers that are not cooling down.
    pub fn reachable(&self) -> Vec<PeerAddr> {
        let now = Instant::now();
        self.inner
            .read()
            .expect("Failed to acquire read lock on peers - this should never happen")
            .iter()
            .filter(|(_, health)| health.retry_after.map_or(true, |until| now >= until))
            .map(|(addr, _)| addr.clone())
            .collect()
    }

    pub fn record_success(&self, addr: &PeerAddr) {
        let mut inner = self
            .inner
            .write()
            .expect("Failed to acquire write lock on peers - this should never happen");
        if let Some(health) = inner.get_mut(addr) {
            health.last_success = Some(Instant::now());
            health.consecutive_failures = 0;
            health.retry_after = None;
        }
    }

    pub fn record_failure(&self, addr: &PeerAddr) {
        let mut inner = self
            .inner
            .write()
            .expect("Failed to acquire write lock on peers - this should never happen");
        if let Some(health) = inner.get_mut(addr) {
            health.consecutive_failures = health.consecutive_failures.saturating_add(1);
            if health.consecutive_failures >= self.failure_threshold {
                health.retry_after = Some(Instant::now() + self.cooldown);
                warn!(
                    "Peer {addr} failed {} times in a row, skipping it for {:?}",
                    health.consecutive_failures, self.cooldown
                );
            }
        }
    }

    pub fn last_success(&self, addr: &PeerAddr) -> Option<Instant> {
        self.inner
            .read()
            .expect("Failed to acquire read lock on peers - this should never happen")
            .get(addr)
            .and_then(|health| health.last_success)
    }

    pub fn contains(&self, addr: &PeerAddr) -> bool {
        self.inner
            .read()
            .expect("Failed to acquire read lock on peers - this should never happen")
            .contains_key(addr)
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .expect("Failed to acquire read lock on peers - this should never happen")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
