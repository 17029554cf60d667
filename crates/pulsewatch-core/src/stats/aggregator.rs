//! Outlier-robust burst statistics
//!
//! Folds finalized bursts into a [`RollingWindow`], rejecting bursts with
//! too many pulses and tracking the first valid burst as a baseline.
//!
//! ## Outlier handling
//!
//! A single oversized burst usually means contact bounce or electrical
//! noise. With [`OutlierPolicy::ResetWindow`] the whole window is
//! invalidated, so the averages restart from clean data. The baseline
//! survives an invalidation until it has been held for the minimum hold
//! time. [`OutlierPolicy::DiscardSample`] drops just the offending burst.

use crate::config::{MonitorConfig, OutlierPolicy};
use crate::pulse::record::BurstRecord;

use super::report::{Baseline, StatsReport};
use super::window::{RollingWindow, WindowSample};

/// Outcome of folding one burst into the statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowUpdate {
    /// Burst written into the window
    Accepted {
        /// This burst became the new baseline
        baseline_captured: bool,
    },
    /// Burst exceeded the pulse limit and was excluded
    Rejected {
        /// The whole window was invalidated
        window_reset: bool,
        /// The baseline was old enough to be cleared
        baseline_cleared: bool,
    },
}

/// Rolling statistics over finalized bursts
#[derive(Debug)]
pub struct StatsAggregator {
    window: RollingWindow,
    baseline: Option<Baseline>,
    max_pulse_count: u16,
    baseline_min_hold_ms: u32,
    policy: OutlierPolicy,
}

impl StatsAggregator {
    /// Build an aggregator from config, allocating the window
    pub fn new(config: &MonitorConfig) -> Result<Self, std::collections::TryReserveError> {
        Ok(Self {
            window: RollingWindow::with_capacity(config.window_size)?,
            baseline: None,
            max_pulse_count: config.max_pulse_count,
            baseline_min_hold_ms: config.baseline_min_hold_ms,
            policy: config.outlier_policy,
        })
    }

    /// Fold a finalized burst into the window
    ///
    /// # Arguments
    /// * `record` - Burst to fold in
    /// * `now_ms` - Millisecond clock, used for baseline capture and hold
    pub fn process(&mut self, record: &BurstRecord, now_ms: u32) -> WindowUpdate {
        if record.pulse_count > self.max_pulse_count {
            return self.reject(record, now_ms);
        }

        self.window.push(WindowSample::from(record));

        let baseline_captured = self.baseline.is_none();
        if baseline_captured {
            let baseline = Baseline::capture(record, now_ms);
            tracing::info!(
                pulse_count = baseline.pulse_count,
                frequency_khz = %format!("{:.2}", baseline.frequency_khz),
                "baseline_captured"
            );
            self.baseline = Some(baseline);
        }

        tracing::debug!(
            pulse_count = record.pulse_count,
            valid = self.window.valid_count(),
            "burst_accepted"
        );

        WindowUpdate::Accepted { baseline_captured }
    }

    fn reject(&mut self, record: &BurstRecord, now_ms: u32) -> WindowUpdate {
        tracing::warn!(
            pulse_count = record.pulse_count,
            limit = self.max_pulse_count,
            "Burst exceeds pulse limit, ignoring"
        );

        if self.policy == OutlierPolicy::DiscardSample {
            return WindowUpdate::Rejected {
                window_reset: false,
                baseline_cleared: false,
            };
        }

        self.window.invalidate();

        let baseline_cleared = match self.baseline {
            Some(b) => {
                let held =
                    now_ms.wrapping_sub(b.captured_at_ms) >= self.baseline_min_hold_ms;
                if held {
                    tracing::info!("Resetting baseline after minimum hold");
                    self.baseline = None;
                } else {
                    tracing::info!("Preserving baseline within minimum hold");
                }
                held
            }
            None => false,
        };

        WindowUpdate::Rejected {
            window_reset: true,
            baseline_cleared,
        }
    }

    /// Rolling-average report, `None` while the window is empty
    pub fn report(&self) -> Option<StatsReport> {
        let means = self.window.means()?;
        Some(StatsReport::new(means, self.baseline))
    }

    /// Drop the window and the baseline
    pub fn clear(&mut self) {
        self.window.invalidate();
        self.baseline = None;
    }

    pub fn window(&self) -> &RollingWindow {
        &self.window
    }

    pub fn baseline(&self) -> Option<&Baseline> {
        self.baseline.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pulses: u16) -> BurstRecord {
        BurstRecord {
            pulse_count: pulses,
            burst_duration_us: pulses as u32 * 200,
            off_period_us: 100_000,
            frequency_khz: 5.0,
            first_pulse_period_us: 200,
            timestamp_ms: 0,
            success: true,
        }
    }

    fn aggregator() -> StatsAggregator {
        StatsAggregator::new(&MonitorConfig::default()).unwrap()
    }

    #[test]
    fn test_first_valid_burst_becomes_baseline() {
        let mut agg = aggregator();
        assert_eq!(
            agg.process(&record(20), 100),
            WindowUpdate::Accepted {
                baseline_captured: true
            }
        );
        assert_eq!(
            agg.process(&record(22), 200),
            WindowUpdate::Accepted {
                baseline_captured: false
            }
        );

        let baseline = agg.baseline().unwrap();
        assert_eq!(baseline.pulse_count, 20);
        assert_eq!(baseline.captured_at_ms, 100);
    }

    #[test]
    fn test_outlier_is_not_baseline() {
        let mut agg = aggregator();
        agg.process(&record(41), 0);
        assert!(agg.baseline().is_none());

        agg.process(&record(40), 10);
        assert_eq!(agg.baseline().unwrap().pulse_count, 40);
    }

    #[test]
    fn test_outlier_resets_whole_window() {
        let mut agg = aggregator();
        for i in 0..7 {
            agg.process(&record(10 + i), 0);
        }
        assert_eq!(agg.window().valid_count(), 7);

        let update = agg.process(&record(45), 10);
        assert!(matches!(
            update,
            WindowUpdate::Rejected {
                window_reset: true,
                ..
            }
        ));
        assert_eq!(agg.window().valid_count(), 0);
        assert_eq!(agg.window().write_index(), 0);
        assert!(agg.report().is_none());
    }

    #[test]
    fn test_limit_is_inclusive() {
        let mut agg = aggregator();
        agg.process(&record(5), 0);
        agg.process(&record(40), 0);
        assert_eq!(agg.window().valid_count(), 2);
    }

    #[test]
    fn test_baseline_preserved_within_hold() {
        let mut agg = aggregator();
        agg.process(&record(20), 1_000);

        let update = agg.process(&record(50), 3_999);
        assert_eq!(
            update,
            WindowUpdate::Rejected {
                window_reset: true,
                baseline_cleared: false
            }
        );
        assert!(agg.baseline().is_some());
    }

    #[test]
    fn test_baseline_cleared_at_hold() {
        let mut agg = aggregator();
        agg.process(&record(20), 1_000);

        let update = agg.process(&record(50), 4_000);
        assert_eq!(
            update,
            WindowUpdate::Rejected {
                window_reset: true,
                baseline_cleared: true
            }
        );
        assert!(agg.baseline().is_none());

        agg.process(&record(30), 4_010);
        assert_eq!(agg.baseline().unwrap().pulse_count, 30);
    }

    #[test]
    fn test_long_held_baseline_still_clears() {
        let mut agg = aggregator();
        agg.process(&record(20), 1_000);

        // Held for more than half the millisecond counter range
        let update = agg.process(&record(50), 1_000 + 3_000_000_000);
        assert_eq!(
            update,
            WindowUpdate::Rejected {
                window_reset: true,
                baseline_cleared: true
            }
        );
        assert!(agg.baseline().is_none());
    }

    #[test]
    fn test_discard_sample_policy_keeps_window() {
        let config = MonitorConfig {
            outlier_policy: OutlierPolicy::DiscardSample,
            ..Default::default()
        };
        let mut agg = StatsAggregator::new(&config).unwrap();
        agg.process(&record(10), 0);
        agg.process(&record(12), 0);

        let update = agg.process(&record(90), 60_000);
        assert_eq!(
            update,
            WindowUpdate::Rejected {
                window_reset: false,
                baseline_cleared: false
            }
        );
        assert_eq!(agg.window().valid_count(), 2);
        assert!(agg.baseline().is_some());
        assert_eq!(agg.report().unwrap().means.pulse_count, 11.0);
    }

    #[test]
    fn test_report_includes_change() {
        let mut agg = aggregator();
        agg.process(&record(20), 0);
        agg.process(&record(30), 0);

        let report = agg.report().unwrap();
        assert_eq!(report.means.samples, 2);
        assert_eq!(report.means.pulse_count, 25.0);
        let change = report.change.unwrap();
        assert_eq!(change.pulse_count_pct, Some(25.0));
        assert_eq!(change.frequency_pct, Some(0.0));
    }

    #[test]
    fn test_clear() {
        let mut agg = aggregator();
        agg.process(&record(20), 0);
        agg.clear();
        assert!(agg.baseline().is_none());
        assert!(agg.window().is_empty());
    }
}
