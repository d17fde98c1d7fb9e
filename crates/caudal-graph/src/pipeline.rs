//! The top-level pipeline: lifecycle state machine plus event bus.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::element::Element;
use crate::event::{BusMessage, EventBus};
use crate::{Error, Result};

/// Lifecycle state of the pipeline and its elements.
///
/// Forward transitions are requested one hop at a time
/// (`NULL → READY → PAUSED → PLAYING`); teardown requests `NULL` from any
/// state. Terminal conditions (error, end of stream) are not states here —
/// they are bus messages consumed by the controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum State {
    /// No resources allocated.
    Null,
    /// Resources allocated, clocks stopped.
    Ready,
    /// Data may be queued but does not flow.
    Paused,
    /// Buffers flow.
    Playing,
}

impl State {
    /// The adjacent state one hop toward `target`, or `None` when already
    /// there.
    pub fn toward(self, target: State) -> Option<State> {
        use State::{Null, Paused, Playing, Ready};
        if self == target {
            return None;
        }
        Some(if target > self {
            match self {
                Null => Ready,
                Ready => Paused,
                Paused | Playing => Playing,
            }
        } else {
            match self {
                Playing => Paused,
                Paused => Ready,
                Ready | Null => Null,
            }
        })
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Null => "NULL",
            Self::Ready => "READY",
            Self::Paused => "PAUSED",
            Self::Playing => "PLAYING",
        };
        write!(f, "{name}")
    }
}

/// The full graph under one root: a set of elements, a lifecycle state, and
/// the event bus connecting streaming threads to the control thread.
///
/// Only one thread (the control thread) may call [`set_state`](Self::set_state);
/// streaming threads interact with the pipeline exclusively through the bus.
pub struct Pipeline {
    name: String,
    elements: Vec<Arc<dyn Element>>,
    bus: EventBus,
    state: Mutex<State>,
}

impl Pipeline {
    /// Creates an empty pipeline in `NULL` state.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            elements: Vec::new(),
            bus: EventBus::new(),
            state: Mutex::new(State::Null),
        }
    }

    /// Pipeline name, the `source` of its own `StateChanged` messages.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a top-level element. Call before the first `set_state`.
    pub fn add(&mut self, element: Arc<dyn Element>) {
        self.elements.push(element);
    }

    /// The event bus for this pipeline.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Current lifecycle state.
    pub fn state(&self) -> State {
        *self.lock_state()
    }

    fn lock_state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Steps the pipeline to `target`, one adjacent state at a time.
    ///
    /// Each hop transitions every element — sinks first on the way up, in
    /// add order on the way down — and posts a pipeline-sourced
    /// `StateChanged` message. The first element failure aborts the walk
    /// and leaves the pipeline at the last fully reached state.
    pub fn set_state(&self, target: State) -> Result<()> {
        loop {
            let current = self.state();
            let Some(next) = current.toward(target) else {
                return Ok(());
            };
            let upward = next > current;
            let result = if upward {
                self.transition_all(self.elements.iter().rev(), current, next)
            } else {
                self.transition_all(self.elements.iter(), current, next)
            };
            if let Err(err) = result {
                tracing::error!(
                    pipeline = %self.name,
                    from = %current,
                    to = %next,
                    error = %err,
                    "state transition failed"
                );
                return Err(err);
            }
            *self.lock_state() = next;
            tracing::debug!(pipeline = %self.name, from = %current, to = %next, "state changed");
            self.bus.post(BusMessage::StateChanged {
                source: self.name.clone(),
                old: current,
                new: next,
                pending: (next != target).then_some(target),
            });
        }
    }

    fn transition_all<'a>(
        &self,
        elements: impl Iterator<Item = &'a Arc<dyn Element>>,
        current: State,
        next: State,
    ) -> Result<()> {
        for element in elements {
            element
                .transition(current, next, &self.bus)
                .map_err(|err| match err {
                    already @ Error::StateTransition { .. } => already,
                    other => Error::StateTransition {
                        element: element.name().to_string(),
                        target: next,
                        reason: other.to_string(),
                    },
                })?;
        }
        Ok(())
    }
}
