//! Monotonic time sources
//!
//! The monitor only ever sees time as wrapping `u32` counters of
//! microseconds and milliseconds, the same shape a microcontroller timer
//! exposes. All interval arithmetic goes through [`elapsed`] so that
//! counter wraparound (~71 minutes for the microsecond counter) is handled
//! with unsigned subtraction.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Source of monotonic microsecond and millisecond counters
pub trait Clock: Send + Sync {
    /// Microseconds since an arbitrary epoch, wrapping at `u32::MAX`
    fn now_micros(&self) -> u32;

    /// Milliseconds since the same epoch, wrapping at `u32::MAX`
    fn now_millis(&self) -> u32;
}

/// Time elapsed from `earlier` to `later` on a wrapping counter
///
/// Returns `None` when `later` is actually behind `earlier` (the wrapped
/// difference lands in the upper half of the counter range).
///
/// # Example
/// ```
/// use pulsewatch_core::clock::elapsed;
///
/// assert_eq!(elapsed(2500, 300), Some(2200));
/// assert_eq!(elapsed(10, u32::MAX - 9), Some(20));
/// assert_eq!(elapsed(300, 2500), None);
/// ```
pub fn elapsed(later: u32, earlier: u32) -> Option<u32> {
    let diff = later.wrapping_sub(earlier);
    if diff > u32::MAX / 2 {
        None
    } else {
        Some(diff)
    }
}

/// Wall-clock backed monotonic clock
///
/// Counts from the moment it was created.
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
    fn now_micros(&self) -> u32 {
        // Truncation is the wraparound
        self.origin.elapsed().as_micros() as u32
    }

    fn now_millis(&self) -> u32 {
        self.origin.elapsed().as_millis() as u32
    }
}

/// Manually advanced clock for tests and simulation
///
/// Clones share the same underlying counter, so a test can hold one handle
/// while the monitor and the edge handler hold others.
///
/// # Example
/// ```
/// use pulsewatch_core::clock::{Clock, ManualClock};
///
/// let clock = ManualClock::new();
/// let shared = clock.clone();
/// clock.advance_micros(2_500);
/// assert_eq!(shared.now_micros(), 2_500);
/// assert_eq!(shared.now_millis(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    micros: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Jump to an absolute time in microseconds
    pub fn set_micros(&self, micros: u64) {
        self.micros.store(micros, Ordering::Release);
    }

    pub fn advance_micros(&self, delta: u64) {
        self.micros.fetch_add(delta, Ordering::AcqRel);
    }

    pub fn advance_millis(&self, delta: u64) {
        self.advance_micros(delta * 1_000);
    }

    /// Full-width time in microseconds (never wraps)
    pub fn total_micros(&self) -> u64 {
        self.micros.load(Ordering::Acquire)
    }
}

impl Clock for ManualClock {
    fn now_micros(&self) -> u32 {
        self.total_micros() as u32
    }

    fn now_millis(&self) -> u32 {
        (self.total_micros() / 1_000) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_simple() {
        assert_eq!(elapsed(100, 0), Some(100));
        assert_eq!(elapsed(0, 0), Some(0));
    }

    #[test]
    fn test_elapsed_across_wrap() {
        let before = u32::MAX - 499;
        let after = before.wrapping_add(1_000);
        assert_eq!(elapsed(after, before), Some(1_000));
    }

    #[test]
    fn test_elapsed_backwards() {
        assert_eq!(elapsed(1_000, 2_000), None);
    }

    #[test]
    fn test_manual_clock_wraps_micros() {
        let clock = ManualClock::new();
        clock.set_micros(u32::MAX as u64 + 11);
        assert_eq!(clock.now_micros(), 10);
        assert_eq!(clock.total_micros(), u32::MAX as u64 + 11);
    }

    #[test]
    fn test_manual_clock_millis() {
        let clock = ManualClock::new();
        clock.advance_millis(3_000);
        clock.advance_micros(999);
        assert_eq!(clock.now_millis(), 3_000);
    }

    #[test]
    fn test_system_clock_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now_micros();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let b = clock.now_micros();
        assert!(elapsed(b, a).unwrap() >= 2_000);
    }
}
