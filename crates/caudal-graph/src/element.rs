//! The element trait implemented by every processing node.

use std::sync::Arc;

use crate::event::EventBus;
use crate::pipeline::State;
use crate::port::Port;
use crate::Result;

/// A unit in the processing graph that consumes and/or produces buffers.
///
/// Implemented uniformly by atomic elements and by [`Bin`](crate::Bin)
/// composites, so linking and state-transition code never distinguishes the
/// two: a composite exposes virtual ports that forward into its sub-graph.
pub trait Element: Send + Sync {
    /// Element name, unique within its graph, used in diagnostics and bus
    /// messages.
    fn name(&self) -> &str;

    /// The element's externally linkable input port, if it has one.
    fn input_port(&self) -> Option<Arc<Port>> {
        None
    }

    /// Moves the element one lifecycle hop, `from` an adjacent state `to`
    /// the next.
    ///
    /// Called by the pipeline on the control thread, one adjacent state at a
    /// time. Elements that allocate resources do so here (a device sink opens
    /// its stream on the way to `Ready`, a source starts streaming on the way
    /// to `Playing`) and must fail by returning an error, never by panicking.
    /// The `bus` handle may be retained for posting from streaming threads.
    fn transition(&self, from: State, to: State, bus: &EventBus) -> Result<()> {
        let _ = (from, to, bus);
        Ok(())
    }
}
