//! Polling-side burst finalization
//!
//! A burst ends when the line stays quiet, and silence raises no event, so
//! completion has to be discovered by looking at the clock. [`BurstPoller`]
//! does one such look per call to [`BurstPoller::poll`]:
//!
//! 1. Snapshot the shared segmenter state (clearing the notify flag)
//! 2. If the burst has been quiet past the timeout, finalize it into a
//!    [`BurstRecord`], fold it into the statistics and publish it
//! 3. Otherwise, if a new burst just started, publish an active status
//! 4. Emit a rolling-average report when the report interval has elapsed
//!
//! Only step 1 touches shared state. Everything after it works on the
//! local snapshot and on state owned by the poller alone.

use std::sync::Arc;

use super::publisher::ResultPublisher;
use super::record::{BurstRecord, PublishedStatus};
use super::segmenter::BurstSegmenter;
use crate::stats::aggregator::{StatsAggregator, WindowUpdate};
use crate::stats::report::StatsReport;

/// What happened during one poll cycle
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollOutcome {
    /// A burst ended and was folded into the statistics
    pub finalized: Option<(BurstRecord, WindowUpdate)>,
    /// A new burst was announced as active
    pub burst_started: bool,
    /// The periodic report fell due
    pub report: Option<StatsReport>,
}

/// Owner of everything the polling context computes
#[derive(Debug)]
pub struct BurstPoller {
    segmenter: Arc<BurstSegmenter>,
    publisher: Arc<ResultPublisher>,
    aggregator: StatsAggregator,
    /// End of the previous finalized burst (µs)
    previous_end_us: Option<u32>,
    /// Last published status was active
    was_active: bool,
    /// Most recent finalized burst, carried in active statuses
    last_record: Option<BurstRecord>,
    last_report_ms: u32,
    report_interval_ms: u32,
    /// Number of bursts finalized
    burst_count: u64,
}

impl BurstPoller {
    /// Create a poller
    ///
    /// # Arguments
    /// * `segmenter` - State shared with the edge handler
    /// * `publisher` - Slot to publish statuses into
    /// * `aggregator` - Statistics, owned from here on
    /// * `report_interval_ms` - Period of the rolling-average report
    /// * `now_ms` - Millisecond clock; the first report is due one interval later
    pub fn new(
        segmenter: Arc<BurstSegmenter>,
        publisher: Arc<ResultPublisher>,
        aggregator: StatsAggregator,
        report_interval_ms: u32,
        now_ms: u32,
    ) -> Self {
        Self {
            segmenter,
            publisher,
            aggregator,
            previous_end_us: None,
            was_active: false,
            last_record: None,
            last_report_ms: now_ms,
            report_interval_ms,
            burst_count: 0,
        }
    }

    /// Run one poll cycle at the given clock readings
    pub fn poll(&mut self, now_us: u32, now_ms: u32) -> PollOutcome {
        let snapshot = self.segmenter.snapshot();
        let mut outcome = PollOutcome::default();

        if snapshot.active && self.segmenter.is_timed_out(&snapshot, now_us) {
            self.segmenter.finish_burst();

            let record = BurstRecord::finalize(&snapshot, now_us, self.previous_end_us, now_ms);
            let update = self.aggregator.process(&record, now_ms);
            self.previous_end_us = Some(now_us);
            self.burst_count += 1;

            tracing::debug!(
                pulse_count = record.pulse_count,
                duration_us = record.burst_duration_us,
                off_us = record.off_period_us,
                first_pulse_us = record.first_pulse_period_us,
                frequency_khz = %format!("{:.2}", record.frequency_khz),
                "burst_finalized"
            );

            self.last_record = Some(record);
            self.publisher.publish(PublishedStatus {
                active: false,
                record: Some(record),
            });
            self.was_active = false;
            outcome.finalized = Some((record, update));
        } else if snapshot.notify && !self.was_active {
            tracing::trace!(start_us = snapshot.burst_start_us, "burst_started");

            self.publisher.publish(PublishedStatus {
                active: true,
                record: self.last_record,
            });
            self.was_active = true;
            outcome.burst_started = true;
        }

        let report_due = now_ms.wrapping_sub(self.last_report_ms) >= self.report_interval_ms;
        if report_due {
            if let Some(report) = self.aggregator.report() {
                self.last_report_ms = now_ms;
                outcome.report = Some(report);
            }
        }

        outcome
    }

    /// Drop window, baseline and burst bookkeeping
    pub fn clear(&mut self) {
        self.aggregator.clear();
        self.previous_end_us = None;
        self.was_active = false;
        self.last_record = None;
    }

    pub fn aggregator(&self) -> &StatsAggregator {
        &self.aggregator
    }

    pub fn burst_count(&self) -> u64 {
        self.burst_count
    }
}
