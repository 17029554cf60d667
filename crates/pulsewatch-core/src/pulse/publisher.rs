//! Latest-value status slot
//!
//! Writers overwrite, readers peek. There is no queue: a reader always sees
//! the most recent status and a slow reader never holds up the poller. Once
//! closed, the slot refuses writes and reads fail with
//! [`MonitorError::AlreadyStopped`].

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::monitor::MonitorError;
use super::record::PublishedStatus;

#[derive(Debug, Default)]
struct Slot {
    latest: Option<PublishedStatus>,
    closed: bool,
}

/// Single-slot overwrite publisher
#[derive(Debug, Default)]
pub struct ResultPublisher {
    slot: Mutex<Slot>,
    published: Condvar,
}

impl ResultPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Overwrite the slot
    ///
    /// Returns `false` if the publisher has been closed and the status was
    /// dropped.
    pub fn publish(&self, status: PublishedStatus) -> bool {
        let mut slot = self.lock();
        if slot.closed {
            return false;
        }
        slot.latest = Some(status);
        drop(slot);
        self.published.notify_all();
        true
    }

    /// Peek at the latest status, waiting up to `timeout` for a first one
    ///
    /// # Returns
    /// `Ok(None)` if nothing was published in time,
    /// `Err(AlreadyStopped)` once the publisher is closed.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use pulsewatch_core::pulse::publisher::ResultPublisher;
    /// use pulsewatch_core::pulse::record::PublishedStatus;
    ///
    /// let publisher = ResultPublisher::new();
    /// assert_eq!(publisher.read_latest(Duration::ZERO).unwrap(), None);
    ///
    /// publisher.publish(PublishedStatus { active: true, record: None });
    /// let first = publisher.read_latest(Duration::ZERO).unwrap();
    /// let second = publisher.read_latest(Duration::ZERO).unwrap();
    /// assert_eq!(first, second);
    /// ```
    pub fn read_latest(&self, timeout: Duration) -> Result<Option<PublishedStatus>, MonitorError> {
        let slot = self.lock();
        let (slot, _) = self
            .published
            .wait_timeout_while(slot, timeout, |s| s.latest.is_none() && !s.closed)
            .unwrap_or_else(PoisonError::into_inner);

        if slot.closed {
            return Err(MonitorError::AlreadyStopped);
        }
        Ok(slot.latest)
    }

    /// Most recent status without waiting, `None` once closed
    pub fn latest(&self) -> Option<PublishedStatus> {
        let slot = self.lock();
        if slot.closed {
            None
        } else {
            slot.latest
        }
    }

    /// Release the slot and wake any waiting reader
    pub fn close(&self) {
        let mut slot = self.lock();
        slot.closed = true;
        slot.latest = None;
        drop(slot);
        self.published.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}
