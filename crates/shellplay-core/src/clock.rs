//! Time source for every timed wait in playback
//!
//! Production uses [`SystemClock`]. Tests use [`VirtualClock`], where `sleep`
//! advances a counter instead of blocking, so a full run completes instantly
//! with exact timestamps.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub trait Clock: Send + Sync {
    /// Time elapsed since the clock was created
    fn now(&self) -> Duration;

    /// Cooperative suspension point
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

#[derive(Debug, Default)]
pub struct VirtualClock {
    now: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl VirtualClock {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn advance(&self, duration: Duration) {
        *self.now.lock() += duration;
    }

    /// Every non-zero sleep requested so far, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Duration {
        *self.now.lock()
    }

    fn sleep(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        self.sleeps.lock().push(duration);
        self.advance(duration);
    }
}

/// Milliseconds as a `Duration`, clamped at zero for negative or NaN input
pub fn millis(ms: f64) -> Duration {
    if ms.is_finite() && ms > 0.0 {
        Duration::from_secs_f64(ms / 1000.0)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_sleep_advances_without_blocking() {
        let clock = VirtualClock::new();
        clock.sleep(Duration::from_secs(3600));
        clock.sleep(Duration::ZERO);
        clock.sleep(Duration::from_millis(5));
        assert_eq!(clock.now(), Duration::from_millis(3_600_005));
        assert_eq!(clock.sleeps().len(), 2);
    }

    #[test]
    fn millis_clamps() {
        assert_eq!(millis(-4.0), Duration::ZERO);
        assert_eq!(millis(f64::NAN), Duration::ZERO);
        assert_eq!(millis(250.0), Duration::from_millis(250));
    }
}
