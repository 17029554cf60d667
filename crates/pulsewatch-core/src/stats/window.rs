//! Fixed-capacity rolling window of burst metrics
//!
//! The slot arena is allocated once, up front, through a fallible
//! reservation. Afterwards the window never allocates; pushing wraps the
//! write index and saturates the valid count at capacity.

use std::collections::TryReserveError;

use serde::Serialize;

use crate::pulse::record::BurstRecord;

/// Metrics stored per window slot
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WindowSample {
    pub pulse_count: u16,
    pub frequency_khz: f32,
    pub first_pulse_period_us: u32,
    pub burst_duration_us: u32,
    pub off_period_us: u32,
}

impl From<&BurstRecord> for WindowSample {
    fn from(r: &BurstRecord) -> Self {
        Self {
            pulse_count: r.pulse_count,
            frequency_khz: r.frequency_khz,
            first_pulse_period_us: r.first_pulse_period_us,
            burst_duration_us: r.burst_duration_us,
            off_period_us: r.off_period_us,
        }
    }
}

/// Arithmetic means across the valid slots
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WindowMeans {
    pub pulse_count: f32,
    pub frequency_khz: f32,
    pub first_pulse_period_us: f32,
    pub burst_duration_us: f32,
    pub off_period_us: f32,
    /// Number of bursts averaged
    pub samples: usize,
}

/// Circular buffer of the most recent valid bursts
#[derive(Debug)]
pub struct RollingWindow {
    slots: Vec<WindowSample>,
    write_index: usize,
    valid_count: usize,
}

impl RollingWindow {
    /// Allocate a window holding `capacity` bursts
    ///
    /// # Example
    /// ```
    /// use pulsewatch_core::stats::window::{RollingWindow, WindowSample};
    ///
    /// let mut window = RollingWindow::with_capacity(3).unwrap();
    /// for n in [10u16, 20, 30, 40] {
    ///     window.push(WindowSample { pulse_count: n, ..Default::default() });
    /// }
    /// assert_eq!(window.valid_count(), 3);
    /// assert_eq!(window.write_index(), 1);
    /// assert_eq!(window.means().unwrap().pulse_count, 30.0);
    /// ```
    pub fn with_capacity(capacity: usize) -> Result<Self, TryReserveError> {
        let mut slots = Vec::new();
        slots.try_reserve_exact(capacity)?;
        slots.resize(capacity, WindowSample::default());
        Ok(Self {
            slots,
            write_index: 0,
            valid_count: 0,
        })
    }

    /// Write a sample at the current index and advance
    pub fn push(&mut self, sample: WindowSample) {
        let capacity = self.slots.len();
        if capacity == 0 {
            return;
        }
        if let Some(slot) = self.slots.get_mut(self.write_index) {
            *slot = sample;
        }
        self.write_index = (self.write_index + 1) % capacity;
        if self.valid_count < capacity {
            self.valid_count += 1;
        }
    }

    /// Forget every sample
    pub fn invalidate(&mut self) {
        self.slots.fill(WindowSample::default());
        self.write_index = 0;
        self.valid_count = 0;
    }

    /// Means of all valid samples, `None` while the window is empty
    pub fn means(&self) -> Option<WindowMeans> {
        let valid = self.valid_samples();
        if valid.is_empty() {
            return None;
        }

        let mut pulse_count = 0.0f64;
        let mut frequency = 0.0f64;
        let mut first_pulse = 0.0f64;
        let mut duration = 0.0f64;
        let mut off = 0.0f64;
        for s in valid {
            pulse_count += s.pulse_count as f64;
            frequency += s.frequency_khz as f64;
            first_pulse += s.first_pulse_period_us as f64;
            duration += s.burst_duration_us as f64;
            off += s.off_period_us as f64;
        }

        let n = valid.len() as f64;
        Some(WindowMeans {
            pulse_count: (pulse_count / n) as f32,
            frequency_khz: (frequency / n) as f32,
            first_pulse_period_us: (first_pulse / n) as f32,
            burst_duration_us: (duration / n) as f32,
            off_period_us: (off / n) as f32,
            samples: valid.len(),
        })
    }

    /// Samples that have been written since the last invalidation
    ///
    /// Before the buffer first fills these are exactly the leading slots;
    /// afterwards every slot is valid.
    pub fn valid_samples(&self) -> &[WindowSample] {
        self.slots.get(..self.valid_count).unwrap_or(&[])
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn valid_count(&self) -> usize {
        self.valid_count
    }

    pub fn write_index(&self) -> usize {
        self.write_index
    }

    pub fn is_empty(&self) -> bool {
        self.valid_count == 0
    }
}
