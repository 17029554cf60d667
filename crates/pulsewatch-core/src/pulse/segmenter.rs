//! Edge-driven burst segmentation
//!
//! [`BurstSegmenter::on_edge`] runs in the edge-event context for every
//! transition on the monitored line. It only does arithmetic on a handful of
//! scalars inside a short critical section: no allocation, no logging, no
//! waiting on anything the polling side could hold for long.
//!
//! The segmenter never decides that a burst is over. Silence produces no
//! edges, so the end of a burst is detected by the polling loop comparing
//! the clock against [`BurstState::last_edge_us`] and calling
//! [`BurstSegmenter::finish_burst`].

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::clock::elapsed;

/// Shared burst tracking state
///
/// Copied out whole by [`BurstSegmenter::snapshot`]; all derived
/// computation happens on that copy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BurstState {
    /// A burst is in progress
    pub active: bool,
    /// Timestamp of the first edge of the current burst (µs)
    pub burst_start_us: u32,
    /// Timestamp of the most recent edge (µs)
    pub last_edge_us: u32,
    /// Gap between the 2nd and 3rd edges, 0 until measured
    pub first_pulse_period_us: u32,
    /// Edges since the burst started
    pub edge_count: u16,
    /// One-shot "a new burst just started" flag
    pub notify: bool,
    /// Whether any edge has been observed since reset
    pub seen_edge: bool,
}

/// Burst segmenter shared between the edge handler and the poller
#[derive(Debug)]
pub struct BurstSegmenter {
    state: Mutex<BurstState>,
    timeout_us: u32,
}

impl BurstSegmenter {
    /// Create a segmenter with the given end-of-burst silence threshold
    ///
    /// # Example
    /// ```
    /// use pulsewatch_core::pulse::segmenter::BurstSegmenter;
    ///
    /// let seg = BurstSegmenter::new(2000);
    /// for t in [0, 100, 200, 300] {
    ///     seg.on_edge(t);
    /// }
    /// let state = seg.snapshot();
    /// assert!(state.active);
    /// assert_eq!(state.edge_count, 4);
    /// assert_eq!(state.first_pulse_period_us, 100);
    /// ```
    pub fn new(timeout_us: u32) -> Self {
        Self {
            state: Mutex::new(BurstState::default()),
            timeout_us,
        }
    }

    // A panic while holding the lock cannot leave the scalar fields torn,
    // so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, BurstState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record one edge observed at `now_us`
    pub fn on_edge(&self, now_us: u32) {
        let mut state = self.lock();

        // Plain wrapping gap, so a long idle line still reads as quiet
        let quiet =
            !state.seen_edge || now_us.wrapping_sub(state.last_edge_us) > self.timeout_us;

        if !state.active && quiet {
            state.burst_start_us = now_us;
            state.edge_count = 1;
            state.active = true;
            state.first_pulse_period_us = 0;
            state.notify = true;
        } else if state.active {
            state.edge_count = state.edge_count.saturating_add(1);
            if state.edge_count == 3 && state.first_pulse_period_us == 0 {
                state.first_pulse_period_us = now_us.wrapping_sub(state.last_edge_us);
            }
        }

        state.last_edge_us = now_us;
        state.seen_edge = true;
    }

    /// Copy the shared state and clear the one-shot notify flag
    pub fn snapshot(&self) -> BurstState {
        let mut state = self.lock();
        let copy = *state;
        state.notify = false;
        copy
    }

    /// Mark the current burst as finished
    pub fn finish_burst(&self) {
        self.lock().active = false;
    }

    /// Return to the power-on state
    pub fn reset(&self) {
        *self.lock() = BurstState::default();
    }

    /// End-of-burst silence threshold (µs)
    pub fn timeout_us(&self) -> u32 {
        self.timeout_us
    }

    /// Whether the silence since the last edge ends a burst at `now_us`
    pub fn is_timed_out(&self, state: &BurstState, now_us: u32) -> bool {
        elapsed(now_us, state.last_edge_us).is_some_and(|gap| gap > self.timeout_us)
    }
}
