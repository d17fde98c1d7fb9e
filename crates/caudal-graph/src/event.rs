//! The pipeline event bus.
//!
//! Streaming threads never surface errors synchronously; everything
//! terminal or informational travels as a [`BusMessage`] over an ordered,
//! blocking channel that the control thread consumes. Any element holding an
//! [`EventSender`] may post from any thread.

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::pipeline::State;

/// A lifecycle notification from the running graph.
///
/// The set of message kinds may grow; consumers must ignore kinds they do
/// not recognize.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum BusMessage {
    /// A streaming error. Terminal for the consumer.
    Error {
        /// Name of the element that reported the error.
        source: String,
        /// Human-readable description.
        message: String,
        /// Optional technical detail for diagnosis.
        debug: Option<String>,
    },
    /// End of stream: the source has delivered its last buffer. Terminal.
    Eos,
    /// An element completed a state transition. Informational.
    StateChanged {
        /// Name of the element whose state changed.
        source: String,
        /// State before the transition.
        old: State,
        /// State after the transition.
        new: State,
        /// Further state still being worked toward, if any.
        pending: Option<State>,
    },
}

/// Cloneable posting handle for streaming threads and signal handlers.
#[derive(Clone)]
pub struct EventSender {
    tx: Sender<BusMessage>,
}

impl EventSender {
    /// Posts a message to the bus. Best-effort: a bus whose consumer is gone
    /// silently discards.
    pub fn post(&self, message: BusMessage) {
        let _ = self.tx.send(message);
    }

    /// Posts an error message from the named element.
    pub fn post_error(&self, source: &str, message: impl Into<String>, debug: Option<String>) {
        self.post(BusMessage::Error {
            source: source.to_string(),
            message: message.into(),
            debug,
        });
    }
}

/// Ordered, blocking event channel from the graph to its controller.
pub struct EventBus {
    tx: Sender<BusMessage>,
    rx: Receiver<BusMessage>,
}

impl EventBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// Posts a message.
    pub fn post(&self, message: BusMessage) {
        let _ = self.tx.send(message);
    }

    /// Blocks until the next message arrives. No timeout.
    pub fn recv(&self) -> BusMessage {
        // The bus owns a sender, so the channel cannot disconnect.
        self.rx
            .recv()
            .unwrap_or(BusMessage::Eos)
    }

    /// Non-blocking poll, for tests and draining.
    pub fn try_recv(&self) -> Option<BusMessage> {
        self.rx.try_recv().ok()
    }

    /// A posting handle that can outlive borrows of the bus.
    pub fn sender(&self) -> EventSender {
        EventSender {
            tx: self.tx.clone(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
