//! Processing-graph framework for the Caudal audio pipeline.
//!
//! The graph is a set of [`Element`]s connected through typed [`Port`]s:
//! output ports push buffers across links into input ports' chain functions.
//! Format negotiation is descriptor-driven — a [`FormatDescriptor`] attached
//! to a link constrains what flows across it, and converters adapt buffers to
//! whatever their downstream link demands.
//!
//! # Architecture
//!
//! - **Data plane**: buffers flow on streaming threads. A [`Queue`](elements::Queue)
//!   decouples the threading context across a link (its worker thread drives
//!   everything downstream of it), the [`Tee`](elements::Tee) fans one stream
//!   out to several branches, and probes installed on output ports observe
//!   traffic inline without touching it.
//! - **Control plane**: a [`Pipeline`] walks its elements through the
//!   lifecycle states one hop at a time and owns the [`EventBus`]. Streaming
//!   threads never raise errors synchronously; they post [`BusMessage`]s
//!   that the single control thread consumes and arbitrates.
//! - **Composites**: a [`Bin`] owns a sub-graph and exposes it through a
//!   virtual forwarding port, so linking code never distinguishes atomic
//!   from composite elements.
//!
//! # Example
//!
//! ```rust,ignore
//! use caudal_graph::{elements::Queue, elements::Convert, Port, Pipeline, State};
//!
//! let queue = Queue::new("ingress")?;
//! let convert = Convert::new("convert");
//! Port::link(&queue.output(), &convert.input())?;
//!
//! let mut pipeline = Pipeline::new("pipeline");
//! pipeline.add(queue);
//! pipeline.add(convert);
//! pipeline.set_state(State::Playing)?;
//! ```

mod bin;
mod buffer;
mod element;
mod event;
pub mod format;
mod pipeline;
mod port;
pub mod probe;

/// Generic processing elements (queue, convert, tee, fake sink).
pub mod elements;

pub use bin::Bin;
pub use buffer::AudioBuffer;
pub use element::Element;
pub use event::{BusMessage, EventBus, EventSender};
pub use format::{AttrValue, FormatDescriptor};
pub use pipeline::{Pipeline, State};
pub use port::{ChainFn, Direction, EosFn, Port, ProbeAction, ProbeFn};

/// Errors raised by graph construction, linking, and lifecycle operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required element could not be created. Fatal at startup.
    #[error("could not create {kind} element")]
    Construction {
        /// Kind of element that failed to construct.
        kind: &'static str,
    },

    /// A link attempt failed for a reason other than formats.
    #[error("linking {src} -> {sink} failed: {reason}")]
    Link {
        /// Source port path.
        src: String,
        /// Sink port path.
        sink: String,
        /// What went wrong.
        reason: String,
    },

    /// The port already participates in a link. Input ports accept at most
    /// one; detecting this is how dynamic linking stays idempotent.
    #[error("port {port} is already linked")]
    AlreadyLinked {
        /// Path of the already-linked port.
        port: String,
    },

    /// The offered format does not satisfy the link's requirement.
    #[error("format '{offered}' does not satisfy '{required}'")]
    IncompatibleFormats {
        /// The requirement on the link.
        required: String,
        /// The format the source declared.
        offered: String,
    },

    /// An element rejected a lifecycle transition. Fatal at startup.
    #[error("element {element} failed transition to {target}: {reason}")]
    StateTransition {
        /// Element that refused.
        element: String,
        /// State being entered.
        target: State,
        /// The element's reason.
        reason: String,
    },

    /// A buffer had nowhere to go.
    #[error("port {port} has no link")]
    NotLinked {
        /// Path of the unlinked port.
        port: String,
    },
}

/// Convenience result alias for graph operations.
pub type Result<T> = std::result::Result<T, Error>;
