//! Pulsewatch Core - Burst segmentation, rolling statistics and publishing
//!
//! This library watches a digital line that carries bursts of square-wave
//! pulses separated by quiet gaps. Edge events are grouped into bursts, each
//! finished burst is reduced to a handful of metrics, and an outlier-robust
//! rolling average is compared against the first burst seen.

pub mod clock;
pub mod config;
pub mod pulse;
pub mod stats;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{MonitorConfig, OutlierPolicy};
pub use pulse::{
    generator::BurstGenerator,
    line::{EdgeKind, EdgeSource, LineError, SimulatedLine},
    monitor::{BurstMonitor, MonitorError, MonitorState},
    record::{BurstRecord, PublishedStatus},
};
pub use stats::{aggregator::StatsAggregator, report::StatsReport};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date, set by build.rs
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Line monitored when nothing else is configured
pub const DEFAULT_MONITOR_PIN: u8 = 6;

/// Silence after the last edge that ends a burst (2 ms)
pub const BURST_TIMEOUT_US: u32 = 2000;

/// Period of the burst-end polling loop
pub const POLL_INTERVAL_MS: u64 = 10;

/// Period of the rolling-average report
pub const REPORT_INTERVAL_MS: u32 = 1000;

/// Bursts kept in the rolling window
pub const WINDOW_SIZE: usize = 10;

/// Bursts with more pulses than this are treated as anomalous
pub const MAX_PULSE_COUNT: u16 = 40;

/// Minimum time a baseline survives window invalidations
pub const BASELINE_MIN_HOLD_MS: u32 = 3000;
