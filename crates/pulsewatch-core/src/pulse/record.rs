//! Finalized burst metrics and the published status

use serde::{Deserialize, Serialize};

use super::segmenter::BurstState;
use crate::clock::elapsed;

/// Metrics of one completed burst
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BurstRecord {
    /// Number of pulses (two edges per pulse)
    pub pulse_count: u16,
    /// Time from the first edge until the burst was declared over (µs)
    pub burst_duration_us: u32,
    /// Silence between the previous burst's end and this burst's start (µs)
    pub off_period_us: u32,
    /// Pulse rate inside the burst
    pub frequency_khz: f32,
    /// Period of the first pulse (µs), 0 if fewer than three edges
    pub first_pulse_period_us: u32,
    /// Millisecond clock when the burst was finalized
    pub timestamp_ms: u32,
    pub success: bool,
}

impl BurstRecord {
    /// Derive the record for a burst that ended at `now_us`
    ///
    /// # Arguments
    /// * `state` - Snapshot of the segmenter taken this poll cycle
    /// * `now_us` - Microsecond clock at finalization
    /// * `previous_end_us` - End of the previous burst, if there was one
    /// * `now_ms` - Millisecond clock at finalization
    ///
    /// # Example
    /// ```
    /// use pulsewatch_core::pulse::record::BurstRecord;
    /// use pulsewatch_core::pulse::segmenter::BurstState;
    ///
    /// let state = BurstState {
    ///     active: true,
    ///     burst_start_us: 10_000,
    ///     last_edge_us: 12_000,
    ///     first_pulse_period_us: 250,
    ///     edge_count: 20,
    ///     ..Default::default()
    /// };
    /// let record = BurstRecord::finalize(&state, 14_500, Some(4_000), 14);
    /// assert_eq!(record.pulse_count, 10);
    /// assert_eq!(record.burst_duration_us, 4_500);
    /// assert_eq!(record.off_period_us, 6_000);
    /// ```
    pub fn finalize(
        state: &BurstState,
        now_us: u32,
        previous_end_us: Option<u32>,
        now_ms: u32,
    ) -> Self {
        let burst_duration_us = elapsed(now_us, state.burst_start_us).unwrap_or(0);
        let off_period_us = previous_end_us
            .and_then(|end| elapsed(state.burst_start_us, end))
            .unwrap_or(0);
        let pulse_count = state.edge_count / 2;

        let frequency_khz = if state.edge_count >= 4 && burst_duration_us > 0 {
            (pulse_count as f32 * 1000.0) / (burst_duration_us as f32 / 1000.0)
        } else {
            0.0
        };

        Self {
            pulse_count,
            burst_duration_us,
            off_period_us,
            frequency_khz,
            first_pulse_period_us: state.first_pulse_period_us,
            timestamp_ms: now_ms,
            success: true,
        }
    }
}

/// Latest-value status seen by readers of the publisher
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PublishedStatus {
    /// A burst is currently in progress
    pub active: bool,
    /// Most recent finalized burst; an in-progress burst has no metrics yet
    pub record: Option<BurstRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn state(start: u32, last: u32, edges: u16) -> BurstState {
        BurstState {
            active: true,
            burst_start_us: start,
            last_edge_us: last,
            edge_count: edges,
            ..Default::default()
        }
    }

    #[test]
    fn test_pulse_count_is_half_edge_count() {
        for edges in [1u16, 2, 3, 4, 5, 89, 90, 91] {
            let r = BurstRecord::finalize(&state(0, 100, edges), 2_500, None, 2);
            assert_eq!(r.pulse_count, edges / 2);
        }
    }

    #[test]
    fn test_frequency_formula() {
        // 4 edges = 2 pulses over 2.4 ms
        let r = BurstRecord::finalize(&state(0, 300, 4), 2_400, None, 2);
        assert_eq!(r.burst_duration_us, 2_400);
        assert_relative_eq!(r.frequency_khz, 2.0 * 1000.0 / 2.4, epsilon = 1e-3);
    }

    #[test]
    fn test_frequency_zero_below_four_edges() {
        let r = BurstRecord::finalize(&state(0, 100, 3), 2_400, None, 2);
        assert_eq!(r.frequency_khz, 0.0);
    }

    #[test]
    fn test_no_previous_burst_has_zero_off_period() {
        let r = BurstRecord::finalize(&state(5_000, 5_100, 2), 8_000, None, 8);
        assert_eq!(r.off_period_us, 0);
    }

    #[test]
    fn test_negative_durations_floor_at_zero() {
        let r = BurstRecord::finalize(&state(5_000, 5_100, 4), 4_000, Some(6_000), 4);
        assert_eq!(r.burst_duration_us, 0);
        assert_eq!(r.off_period_us, 0);
        assert_eq!(r.frequency_khz, 0.0);
    }

    #[test]
    fn test_record_carries_first_pulse_and_timestamp() {
        let mut s = state(0, 300, 4);
        s.first_pulse_period_us = 100;
        let r = BurstRecord::finalize(&s, 2_400, None, 77);
        assert_eq!(r.first_pulse_period_us, 100);
        assert_eq!(r.timestamp_ms, 77);
        assert!(r.success);
    }
}
