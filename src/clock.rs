//! Injectable millisecond clock.
//!
//! All analytics take `now_ms` parameters; the session stamps times through
//! a [`Clock`] so tests can drive virtual time deterministically.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Millisecond wall-clock source.
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since the Unix epoch. Monotonic
    /// non-decreasing for the lifetime of the clock.
    fn now_ms(&self) -> u64;
}

/// Production clock: wall epoch captured once, advanced by a monotonic
/// tokio instant. Under a paused tokio runtime the advance is virtual,
/// which is what the cadence tests rely on.
#[derive(Debug, Clone)]
pub struct SystemClock {
    epoch_ms: u64,
    origin: tokio::time::Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch_ms: chrono::Utc::now().timestamp_millis().max(0) as u64,
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.epoch_ms + self.origin.elapsed().as_millis() as u64
    }
}

/// Hand-cranked clock for unit tests.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn at(now_ms: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(now_ms)),
        }
    }

    pub fn advance(&self, delta_ms: u64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }

    pub fn set(&self, now_ms: u64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::at(1_000);
        assert_eq!(clock.now_ms(), 1_000);
        clock.advance(250);
        assert_eq!(clock.now_ms(), 1_250);
        clock.set(10_000);
        assert_eq!(clock.now_ms(), 10_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_system_clock_follows_virtual_time() {
        let clock = SystemClock::new();
        let start = clock.now_ms();
        tokio::time::advance(std::time::Duration::from_millis(500)).await;
        assert_eq!(clock.now_ms() - start, 500);
    }
}
