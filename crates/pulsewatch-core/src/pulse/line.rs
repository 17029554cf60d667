//! Monitored line and edge-event registration
//!
//! [`EdgeSource`] is the seam to whatever delivers transitions: a GPIO
//! interrupt on hardware, or [`SimulatedLine`] in tests and the demo
//! binary. Handlers run in the edge-event context and must stay short.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;

/// Which transitions fire the handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Rising,
    Falling,
    /// Both rising and falling
    Change,
}

impl EdgeKind {
    fn fires_on(self, rising: bool) -> bool {
        match self {
            EdgeKind::Rising => rising,
            EdgeKind::Falling => !rising,
            EdgeKind::Change => true,
        }
    }
}

/// Callback invoked for each edge
pub type EdgeHandler = Arc<dyn Fn() + Send + Sync>;

/// Errors raised by an edge source
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    #[error("Pin {0} cannot generate edge events")]
    NoEdgeSupport(u8),

    #[error("Pin {0} already has an edge handler")]
    AlreadyRegistered(u8),

    #[error("Pin {0} is not configured as an input")]
    NotConfigured(u8),
}

/// Provider of edge-event callbacks for a set of pins
pub trait EdgeSource: Send + Sync {
    /// Reserve `pin` as a plain input
    fn configure_input(&self, pin: u8) -> Result<(), LineError>;

    /// Whether `pin` can deliver edge events
    fn supports_edges(&self, pin: u8) -> bool;

    /// Install `handler` to run on every `kind` edge of `pin`
    fn register(&self, pin: u8, kind: EdgeKind, handler: EdgeHandler) -> Result<(), LineError>;

    /// Remove the handler of `pin`; a no-op if none is installed
    fn unregister(&self, pin: u8);
}

struct Registration {
    kind: EdgeKind,
    handler: EdgeHandler,
}

#[derive(Default)]
struct LineState {
    inputs: HashSet<u8>,
    levels: HashMap<u8, bool>,
    handlers: HashMap<u8, Registration>,
}

/// Software line for tests and simulation
///
/// Only the pins listed at construction can generate edges.
///
/// # Example
/// ```
/// use std::sync::atomic::{AtomicU32, Ordering};
/// use std::sync::Arc;
/// use pulsewatch_core::pulse::line::{EdgeKind, EdgeSource, SimulatedLine};
///
/// let line = SimulatedLine::new([6]);
/// line.configure_input(6).unwrap();
/// let hits = Arc::new(AtomicU32::new(0));
/// let h = Arc::clone(&hits);
/// line.register(6, EdgeKind::Change, Arc::new(move || {
///     h.fetch_add(1, Ordering::Relaxed);
/// })).unwrap();
///
/// line.toggle(6);
/// line.toggle(6);
/// assert_eq!(hits.load(Ordering::Relaxed), 2);
/// ```
pub struct SimulatedLine {
    edge_pins: HashSet<u8>,
    state: Mutex<LineState>,
}

impl SimulatedLine {
    pub fn new(edge_pins: impl IntoIterator<Item = u8>) -> Self {
        Self {
            edge_pins: edge_pins.into_iter().collect(),
            state: Mutex::new(LineState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Flip the level of `pin`, firing its handler if one matches
    ///
    /// The handler runs outside the line's lock.
    pub fn toggle(&self, pin: u8) {
        let handler = {
            let mut state = self.lock();
            let level = state.levels.entry(pin).or_insert(false);
            *level = !*level;
            let rising = *level;
            state
                .handlers
                .get(&pin)
                .filter(|r| r.kind.fires_on(rising))
                .map(|r| Arc::clone(&r.handler))
        };

        if let Some(handler) = handler {
            handler();
        }
    }

    /// Current level of `pin`
    pub fn level(&self, pin: u8) -> bool {
        self.lock().levels.get(&pin).copied().unwrap_or(false)
    }

    pub fn is_registered(&self, pin: u8) -> bool {
        self.lock().handlers.contains_key(&pin)
    }
}

impl std::fmt::Debug for SimulatedLine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("SimulatedLine")
            .field("edge_pins", &self.edge_pins)
            .field("inputs", &state.inputs)
            .field("registered", &state.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl EdgeSource for SimulatedLine {
    fn configure_input(&self, pin: u8) -> Result<(), LineError> {
        self.lock().inputs.insert(pin);
        Ok(())
    }

    fn supports_edges(&self, pin: u8) -> bool {
        self.edge_pins.contains(&pin)
    }

    fn register(&self, pin: u8, kind: EdgeKind, handler: EdgeHandler) -> Result<(), LineError> {
        if !self.supports_edges(pin) {
            return Err(LineError::NoEdgeSupport(pin));
        }
        let mut state = self.lock();
        if !state.inputs.contains(&pin) {
            return Err(LineError::NotConfigured(pin));
        }
        if state.handlers.contains_key(&pin) {
            return Err(LineError::AlreadyRegistered(pin));
        }
        state.handlers.insert(pin, Registration { kind, handler });
        Ok(())
    }

    fn unregister(&self, pin: u8) {
        self.lock().handlers.remove(&pin);
    }
}
