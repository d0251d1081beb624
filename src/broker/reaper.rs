//! Idle-client eviction
//!
//! Clients never say goodbye, so the relay forgets any origin that has been
//! silent for longer than the idle timeout. The event loop calls `sweep`
//! every `sweep_interval_ms` (15 s by default).

use std::time::{Duration, Instant};

use tracing::debug;

use super::engine::Broker;
use crate::config::MIN_IDLE_TIMEOUT_MS;
use crate::transport::Transport;

#[derive(Debug, Clone, Copy)]
pub struct IdleReaper {
    idle_timeout: Duration,
}

impl IdleReaper {
    /// `idle_timeout` is raised to the configured floor if below it.
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            idle_timeout: idle_timeout.max(Duration::from_millis(MIN_IDLE_TIMEOUT_MS)),
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Evict every client idle for longer than the timeout as of `now`.
    ///
    /// Returns the number of clients evicted.
    pub fn sweep<T: Transport>(&self, broker: &mut Broker<T>, now: Instant) -> usize {
        debug!(
            "dropping idle clients timeout={}s",
            self.idle_timeout.as_secs_f64()
        );

        let idle: Vec<_> = broker
            .clients
            .iter()
            .filter(|c| now.saturating_duration_since(c.last_seen) > self.idle_timeout)
            .map(|c| c.key)
            .collect();

        idle.iter().filter(|key| broker.drop_client(key)).count()
    }
}
