//! Brute-force login delay.
//!
//! Every failed login for a client address escalates that address's delay;
//! the failing request itself waits the delay out before its 401 is returned.
//! A successful login clears the address. Addresses without a failure for
//! the retention window are forgotten, so spoofed forwarding headers cannot
//! grow the map without bound.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::config::BlockerConfig;
use crate::observability::metrics;

/// Failure bookkeeping for one address.
#[derive(Debug, Clone, Copy)]
struct Entry {
    failures: u32,
    delay: Duration,
    last_failure: Instant,
}

/// Exponential delay for the n-th consecutive failure, capped at `max_ms`.
pub fn login_delay(failures: u32, base_ms: u64, max_ms: u64) -> Duration {
    if failures == 0 {
        return Duration::ZERO;
    }

    let exponential_base = 2u64.saturating_pow(failures - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    Duration::from_millis(delay_ms.min(max_ms))
}

/// Process-wide tracker shared by all request tasks.
pub struct Blocker {
    entries: DashMap<String, Entry>,
    base_ms: u64,
    max_ms: u64,
    retention: Duration,
    started: Instant,
    /// Milliseconds after `started` of the last eviction sweep.
    last_sweep_ms: AtomicU64,
    closed: watch::Sender<bool>,
}

impl Blocker {
    pub fn new(config: &BlockerConfig) -> Self {
        let (closed, _) = watch::channel(false);
        // Never forget an address while its own delay could still be running.
        let retention = Duration::from_secs(config.retention_secs)
            .max(Duration::from_millis(config.max_delay_ms.saturating_mul(2)));
        Self {
            entries: DashMap::new(),
            base_ms: config.base_delay_ms,
            max_ms: config.max_delay_ms,
            retention,
            started: Instant::now(),
            last_sweep_ms: AtomicU64::new(0),
            closed,
        }
    }

    /// Record a failure and return the delay it earns, without waiting.
    ///
    /// The map shard is locked only for the update itself. An entry whose
    /// last failure is older than the retention window starts over.
    pub fn register_failure(&self, address: &str) -> Duration {
        let now = Instant::now();
        self.sweep_if_due(now);

        let mut entry = self.entries.entry(address.to_string()).or_insert(Entry {
            failures: 0,
            delay: Duration::ZERO,
            last_failure: now,
        });
        if now.duration_since(entry.last_failure) >= self.retention {
            entry.failures = 0;
            entry.delay = Duration::ZERO;
        }
        entry.failures = entry.failures.saturating_add(1);
        entry.delay = login_delay(entry.failures, self.base_ms, self.max_ms).max(entry.delay);
        entry.last_failure = now;
        entry.delay
    }

    /// Record a failure, then sleep the resulting delay.
    ///
    /// Bookkeeping is committed before the sleep starts, so dropping this
    /// future (request timeout, disconnect) or closing the blocker only cuts
    /// the wait short.
    pub async fn delay(&self, address: &str) -> Duration {
        let wait = self.register_failure(address);
        metrics::record_login_delay(wait);
        metrics::record_blocked_addresses(self.entries.len());

        let mut closed = self.closed.subscribe();
        if *closed.borrow() {
            return wait;
        }

        tracing::debug!(client = %address, delay_ms = wait.as_millis() as u64, "Delaying failed login");
        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = closed.changed() => {
                tracing::debug!(client = %address, "Login delay abandoned on shutdown");
            }
        }
        wait
    }

    /// Forget an address after a successful login. Idempotent.
    pub fn remove(&self, address: &str) -> bool {
        let removed = self.entries.remove(address).is_some();
        if removed {
            metrics::record_blocked_addresses(self.entries.len());
        }
        removed
    }

    /// Drop every address idle for longer than the retention window.
    ///
    /// Returns the number of addresses forgotten.
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.duration_since(entry.last_failure) < self.retention);
        let evicted = before.saturating_sub(self.entries.len());
        if evicted > 0 {
            tracing::debug!(evicted, remaining = self.entries.len(), "Evicted idle blocker entries");
            metrics::record_blocked_addresses(self.entries.len());
        }
        evicted
    }

    /// Sweep at most once per quarter retention window.
    ///
    /// Must not be called while holding an entry guard.
    fn sweep_if_due(&self, now: Instant) {
        let elapsed = now.duration_since(self.started).as_millis() as u64;
        let interval = (self.retention.as_millis() as u64 / 4).max(1);
        let last = self.last_sweep_ms.load(Ordering::Relaxed);
        if elapsed.saturating_sub(last) < interval {
            return;
        }
        if self
            .last_sweep_ms
            .compare_exchange(last, elapsed, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
        {
            self.evict_expired();
        }
    }

    /// Delay currently associated with an address.
    pub fn current_delay(&self, address: &str) -> Option<Duration> {
        self.entries.get(address).map(|e| e.delay)
    }

    /// Consecutive failures recorded for an address.
    pub fn failures(&self, address: &str) -> u32 {
        self.entries.get(address).map(|e| e.failures).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Abandon all in-flight and future sleeps.
    pub fn close(&self) {
        self.closed.send_replace(true);
    }
}
