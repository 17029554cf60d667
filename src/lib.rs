//! Pulsewatch - Pulse-burst monitor for a digital edge line
//!
//! This library re-exports the burst segmentation, statistics and
//! publishing functionality from `pulsewatch-core`.

pub use pulsewatch_core::clock;
pub use pulsewatch_core::config;
pub use pulsewatch_core::pulse;
pub use pulsewatch_core::stats;

pub use pulsewatch_core::{
    BurstGenerator, BurstMonitor, BurstRecord, Clock, EdgeKind, EdgeSource, LineError,
    ManualClock, MonitorConfig, MonitorError, MonitorState, OutlierPolicy, PublishedStatus,
    SimulatedLine, StatsAggregator, StatsReport, SystemClock,
};
pub use pulsewatch_core::{
    BASELINE_MIN_HOLD_MS, BUILD_DATE, BURST_TIMEOUT_US, DEFAULT_MONITOR_PIN, MAX_PULSE_COUNT,
    POLL_INTERVAL_MS, REPORT_INTERVAL_MS, VERSION, WINDOW_SIZE,
};
