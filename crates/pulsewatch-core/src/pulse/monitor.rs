//! Pulse-burst monitor lifecycle
//!
//! Wires the pieces together:
//! - the edge handler registered on the [`EdgeSource`] feeds the
//!   [`BurstSegmenter`] with clock timestamps
//! - a background thread runs the [`BurstPoller`] every poll interval
//! - readers peek the [`ResultPublisher`] slot through [`BurstMonitor::read_latest`]
//! - rolling-average reports go out on a bounded channel
//!
//! ## Lifecycle
//!
//! ```text
//! Uninitialized --init--> Ready <--> BurstActive --stop--> Stopped
//! ```
//!
//! `stop` unregisters the edge handler before anything else, so no edge can
//! mutate state while the poller is being torn down.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use thiserror::Error;

use super::line::{EdgeHandler, EdgeKind, EdgeSource, LineError};
use super::poller::BurstPoller;
use super::publisher::ResultPublisher;
use super::record::PublishedStatus;
use super::segmenter::BurstSegmenter;
use crate::clock::Clock;
use crate::config::MonitorConfig;
use crate::stats::aggregator::StatsAggregator;
use crate::stats::report::StatsReport;

/// Reports buffered for a slow consumer before new ones are dropped
const REPORT_CHANNEL_CAPACITY: usize = 16;

/// Errors that can occur during monitor operations
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Monitor not initialized")]
    NotInitialized,

    #[error("Pin {0} cannot generate edge events")]
    UnsupportedPin(u8),

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Monitor already stopped")]
    AlreadyStopped,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Edge source error: {0}")]
    Line(#[from] LineError),
}

/// Externally observable monitor state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// `init` has not been called
    Uninitialized,
    /// Edge handler registered, no burst in progress
    Ready,
    /// A burst is in progress
    BurstActive,
    /// Terminal; all operations are rejected
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Uninitialized,
    Initialized,
    Stopped,
}

/// Pulse-burst monitor on one line
pub struct BurstMonitor {
    config: MonitorConfig,
    clock: Arc<dyn Clock>,
    edges: Arc<dyn EdgeSource>,
    lifecycle: Lifecycle,
    pin: Option<u8>,
    segmenter: Option<Arc<BurstSegmenter>>,
    publisher: Option<Arc<ResultPublisher>>,
    /// Allocated at init, handed to the poll thread at start
    aggregator: Option<StatsAggregator>,
    /// Dropping this wakes and ends the poll thread
    shutdown_tx: Option<Sender<()>>,
    poll_thread: Option<JoinHandle<()>>,
    report_tx: Sender<StatsReport>,
    report_rx: Receiver<StatsReport>,
}

impl BurstMonitor {
    /// Create a monitor; nothing is registered until [`Self::init`]
    pub fn new(config: MonitorConfig, clock: Arc<dyn Clock>, edges: Arc<dyn EdgeSource>) -> Self {
        let (report_tx, report_rx) = crossbeam_channel::bounded(REPORT_CHANNEL_CAPACITY);
        Self {
            config,
            clock,
            edges,
            lifecycle: Lifecycle::Uninitialized,
            pin: None,
            segmenter: None,
            publisher: None,
            aggregator: None,
            shutdown_tx: None,
            poll_thread: None,
            report_tx,
            report_rx,
        }
    }

    /// Reserve `pin`, allocate the statistics and register the edge handler
    pub fn init(&mut self, pin: u8) -> Result<(), MonitorError> {
        match self.lifecycle {
            Lifecycle::Stopped => return Err(MonitorError::AlreadyStopped),
            Lifecycle::Initialized => {
                tracing::warn!(pin = ?self.pin, "Pulse burst monitor already initialized");
                return Ok(());
            }
            Lifecycle::Uninitialized => {}
        }

        tracing::info!(pin, "Initializing pulse burst monitor");
        self.config.validate()?;

        self.edges.configure_input(pin)?;

        let aggregator = StatsAggregator::new(&self.config).map_err(|e| {
            tracing::error!(error = %e, "Failed to allocate rolling window");
            MonitorError::ResourceExhausted(format!("rolling window: {}", e))
        })?;

        if !self.edges.supports_edges(pin) {
            tracing::error!(pin, "Pin does not support edge events");
            return Err(MonitorError::UnsupportedPin(pin));
        }

        let segmenter = Arc::new(BurstSegmenter::new(self.config.burst_timeout_us));
        let publisher = Arc::new(ResultPublisher::new());

        let handler_segmenter = Arc::clone(&segmenter);
        let handler_clock = Arc::clone(&self.clock);
        let handler: EdgeHandler = Arc::new(move || {
            handler_segmenter.on_edge(handler_clock.now_micros());
        });
        self.edges
            .register(pin, EdgeKind::Change, handler)
            .map_err(|e| match e {
                LineError::NoEdgeSupport(p) => MonitorError::UnsupportedPin(p),
                other => MonitorError::Line(other),
            })?;

        self.pin = Some(pin);
        self.segmenter = Some(segmenter);
        self.publisher = Some(publisher);
        self.aggregator = Some(aggregator);
        self.lifecycle = Lifecycle::Initialized;

        tracing::info!(
            pin,
            timeout_us = self.config.burst_timeout_us,
            window = self.config.window_size,
            "Pulse burst monitor initialized"
        );
        Ok(())
    }

    /// Start the background poll thread
    pub fn start(&mut self) -> Result<(), MonitorError> {
        match self.lifecycle {
            Lifecycle::Uninitialized => {
                tracing::error!("Cannot start pulse burst monitor - not initialized");
                return Err(MonitorError::NotInitialized);
            }
            Lifecycle::Stopped => return Err(MonitorError::AlreadyStopped),
            Lifecycle::Initialized => {}
        }

        if self.poll_thread.is_some() {
            tracing::warn!("Pulse burst poller already running");
            return Ok(());
        }

        let segmenter = self.segmenter.clone().ok_or(MonitorError::NotInitialized)?;
        let publisher = self.publisher.clone().ok_or(MonitorError::NotInitialized)?;
        let aggregator = self.aggregator.take().ok_or(MonitorError::NotInitialized)?;

        let mut poller = BurstPoller::new(
            segmenter,
            publisher,
            aggregator,
            self.config.report_interval_ms,
            self.clock.now_millis(),
        );

        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
        let clock = Arc::clone(&self.clock);
        let report_tx = self.report_tx.clone();
        let interval = Duration::from_millis(self.config.poll_interval_ms);

        let handle = std::thread::Builder::new()
            .name("pulse-burst-poll".to_string())
            .spawn(move || {
                tracing::info!("Pulse burst poller started");
                loop {
                    match shutdown_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }

                    let outcome = poller.poll(clock.now_micros(), clock.now_millis());
                    if let Some(report) = outcome.report {
                        tracing::info!(
                            pulses = %format!("{:.1}", report.means.pulse_count),
                            frequency_khz = %format!("{:.2}", report.means.frequency_khz),
                            first_pulse_us = %format!("{:.1}", report.means.first_pulse_period_us),
                            burst_us = %format!("{:.1}", report.means.burst_duration_us),
                            off_ms = %format!("{:.2}", report.means.off_period_us / 1000.0),
                            bursts = report.means.samples,
                            "Pulse burst rolling average"
                        );
                        if report_tx.try_send(report).is_err() {
                            tracing::trace!("report_dropped");
                        }
                    }
                }
                tracing::info!(bursts = poller.burst_count(), "Pulse burst poller stopped");
            })
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to spawn pulse burst poller");
                MonitorError::ResourceExhausted(format!("poll thread: {}", e))
            })?;

        self.shutdown_tx = Some(shutdown_tx);
        self.poll_thread = Some(handle);

        tracing::info!(
            poll_ms = self.config.poll_interval_ms,
            report_ms = self.config.report_interval_ms,
            "Pulse burst monitor started"
        );
        Ok(())
    }

    /// Peek the latest published status
    ///
    /// # Returns
    /// `Ok(None)` if nothing was published within `timeout`
    pub fn read_latest(&self, timeout: Duration) -> Result<Option<PublishedStatus>, MonitorError> {
        match self.lifecycle {
            Lifecycle::Uninitialized => Err(MonitorError::NotInitialized),
            Lifecycle::Stopped => Err(MonitorError::AlreadyStopped),
            Lifecycle::Initialized => {
                let publisher = self.publisher.as_ref().ok_or(MonitorError::NotInitialized)?;
                let status = publisher.read_latest(timeout)?;
                if status.is_none() {
                    tracing::debug!("No pulse burst results available");
                }
                Ok(status)
            }
        }
    }

    /// Detach the edge handler, stop the poller and release the slot
    ///
    /// Safe to call while a burst is in progress.
    pub fn stop(&mut self) -> Result<(), MonitorError> {
        match self.lifecycle {
            Lifecycle::Uninitialized => return Err(MonitorError::NotInitialized),
            Lifecycle::Stopped => return Err(MonitorError::AlreadyStopped),
            Lifecycle::Initialized => {}
        }

        if let Some(pin) = self.pin {
            self.edges.unregister(pin);
        }

        // Disconnecting wakes the poll thread mid-wait
        drop(self.shutdown_tx.take());
        if let Some(handle) = self.poll_thread.take() {
            if handle.join().is_err() {
                tracing::error!("Pulse burst poller panicked");
            }
        }

        if let Some(publisher) = self.publisher.take() {
            publisher.close();
        }
        if let Some(segmenter) = self.segmenter.take() {
            segmenter.reset();
        }
        self.aggregator = None;
        self.lifecycle = Lifecycle::Stopped;

        tracing::info!(pin = ?self.pin, "Pulse burst monitor stopped");
        Ok(())
    }

    /// Current lifecycle state
    pub fn state(&self) -> MonitorState {
        match self.lifecycle {
            Lifecycle::Uninitialized => MonitorState::Uninitialized,
            Lifecycle::Stopped => MonitorState::Stopped,
            Lifecycle::Initialized => {
                let active = self
                    .publisher
                    .as_ref()
                    .and_then(|p| p.latest())
                    .is_some_and(|s| s.active);
                if active {
                    MonitorState::BurstActive
                } else {
                    MonitorState::Ready
                }
            }
        }
    }

    /// Receiver for rolling-average reports
    pub fn reports(&self) -> Receiver<StatsReport> {
        self.report_rx.clone()
    }

    pub fn is_running(&self) -> bool {
        self.poll_thread.is_some()
    }

    pub fn pin(&self) -> Option<u8> {
        self.pin
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }
}

impl Drop for BurstMonitor {
    fn drop(&mut self) {
        if self.lifecycle == Lifecycle::Initialized {
            let _ = self.stop();
        }
    }
}
