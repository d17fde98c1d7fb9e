//! Typed connection points between elements.
//!
//! A [`Port`] is either an input (accepts at most one link, owns a chain
//! function that receives buffers) or an output (holds the downstream peer,
//! an optional link-time format constraint, and a probe list). Ports are
//! shared as `Arc<Port>` because streaming threads, the dynamic linker, and
//! the control thread all hold references; all mutable state sits behind a
//! single mutex per port.
//!
//! Locking discipline: the port lock is never held while user code runs.
//! Probes are moved out before invocation and chain functions are cloned out,
//! so a probe or chain body may call back into the same port (e.g. to read
//! its negotiated format).

use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::buffer::AudioBuffer;
use crate::format::FormatDescriptor;
use crate::{Error, Result};

/// Which way buffers flow through a port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Buffers arrive here from an upstream link.
    Input,
    /// Buffers leave here toward a downstream link.
    Output,
}

/// What a probe tells the framework to do with the observed buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeAction {
    /// Continue delivering the buffer downstream (the normal case; passive
    /// observers always return this).
    Pass,
    /// Discard the buffer without delivering it.
    Drop,
}

/// Inline buffer observer installed on an output port.
pub type ProbeFn = Box<dyn FnMut(&Port, &AudioBuffer) -> ProbeAction + Send>;

/// Chain function owned by an input port; receives every delivered buffer.
pub type ChainFn = Arc<dyn Fn(&Port, AudioBuffer) -> Result<()> + Send + Sync>;

/// End-of-stream handler owned by an input port.
pub type EosFn = Arc<dyn Fn(&Port) + Send + Sync>;

#[derive(Default)]
struct PortState {
    /// Output side: the linked downstream input port.
    peer: Option<Arc<Port>>,
    /// Output side: format constraint attached at link time.
    constraint: Option<FormatDescriptor>,
    /// Input side: whether an upstream output has linked to us.
    linked: bool,
    /// Format of the most recent buffer to cross this port.
    current_format: Option<FormatDescriptor>,
    /// Input side: buffer consumer.
    chain: Option<ChainFn>,
    /// Input side: end-of-stream consumer.
    eos: Option<EosFn>,
    /// Output side: installed observers, run in installation order.
    probes: Vec<ProbeFn>,
}

/// A typed connection point on an element.
pub struct Port {
    element: String,
    name: String,
    direction: Direction,
    state: Mutex<PortState>,
}

impl Port {
    /// Creates an output port.
    pub fn output(element: &str, name: &str) -> Arc<Self> {
        Arc::new(Self {
            element: element.to_string(),
            name: name.to_string(),
            direction: Direction::Output,
            state: Mutex::new(PortState::default()),
        })
    }

    /// Creates an input port with the given chain function.
    pub fn input<F>(element: &str, name: &str, chain: F) -> Arc<Self>
    where
        F: Fn(&Port, AudioBuffer) -> Result<()> + Send + Sync + 'static,
    {
        let port = Arc::new(Self {
            element: element.to_string(),
            name: name.to_string(),
            direction: Direction::Input,
            state: Mutex::new(PortState::default()),
        });
        port.lock().chain = Some(Arc::new(chain));
        port
    }

    /// Creates a virtual input port forwarding every buffer to `target`.
    ///
    /// This is how a composite element exposes an internal port on its
    /// boundary: the ghost port looks like any other input to linking code.
    /// End of stream forwards too.
    pub fn ghost_input(element: &str, name: &str, target: Arc<Port>) -> Arc<Self> {
        let eos_target = Arc::clone(&target);
        let port = Self::input(element, name, move |_, buffer| target.deliver(buffer));
        port.set_eos_handler(move |_| eos_target.deliver_eos());
        port
    }

    fn lock(&self) -> MutexGuard<'_, PortState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Name of the element owning this port.
    pub fn element_name(&self) -> &str {
        &self.element
    }

    /// Port name within its element.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// `element:port` path for diagnostics.
    pub fn path(&self) -> String {
        format!("{}:{}", self.element, self.name)
    }

    /// Flow direction of this port.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Whether this port participates in an active link.
    pub fn is_linked(&self) -> bool {
        let state = self.lock();
        match self.direction {
            Direction::Input => state.linked,
            Direction::Output => state.peer.is_some(),
        }
    }

    /// Format of the most recent buffer to cross this port, if any.
    pub fn current_format(&self) -> Option<FormatDescriptor> {
        self.lock().current_format.clone()
    }

    /// Pre-declares the format this port will produce, before any buffer
    /// flows. Sources use this so link-time compatibility checks see a type.
    pub fn set_current_format(&self, format: FormatDescriptor) {
        self.lock().current_format = Some(format);
    }

    /// Constraint attached to this output port's link, if any.
    pub fn link_constraint(&self) -> Option<FormatDescriptor> {
        self.lock().constraint.clone()
    }

    /// Installs a buffer observer on this output port.
    ///
    /// Probes run synchronously on whatever thread pushes the buffer, after
    /// the negotiated format is recorded and before delivery to the peer.
    pub fn add_probe(&self, probe: ProbeFn) {
        self.lock().probes.push(probe);
    }

    /// Links `src` (output) to `sink` (input), unconstrained.
    pub fn link(src: &Arc<Port>, sink: &Arc<Port>) -> Result<()> {
        Self::link_impl(src, sink, None)
    }

    /// Links `src` to `sink` with a format constraint on the link.
    ///
    /// If the source already declares a format, it must satisfy the
    /// constraint; otherwise the check is deferred to buffer flow, where a
    /// converter upstream of the link is expected to honor the constraint.
    pub fn link_filtered(
        src: &Arc<Port>,
        sink: &Arc<Port>,
        constraint: FormatDescriptor,
    ) -> Result<()> {
        Self::link_impl(src, sink, Some(constraint))
    }

    fn link_impl(
        src: &Arc<Port>,
        sink: &Arc<Port>,
        constraint: Option<FormatDescriptor>,
    ) -> Result<()> {
        if src.direction != Direction::Output || sink.direction != Direction::Input {
            return Err(Error::Link {
                src: src.path(),
                sink: sink.path(),
                reason: "ports have the wrong directions".into(),
            });
        }
        // Lock ordering: sink before src, matching delivery order nowhere —
        // the two locks are never taken together elsewhere.
        let mut sink_state = sink.lock();
        if sink_state.linked {
            return Err(Error::AlreadyLinked { port: sink.path() });
        }
        let mut src_state = src.lock();
        if src_state.peer.is_some() {
            return Err(Error::AlreadyLinked { port: src.path() });
        }
        if let (Some(required), Some(offered)) = (&constraint, &src_state.current_format)
            && !required.accepts(offered)
        {
            return Err(Error::IncompatibleFormats {
                required: required.to_string(),
                offered: offered.to_string(),
            });
        }
        src_state.peer = Some(Arc::clone(sink));
        src_state.constraint = constraint;
        sink_state.linked = true;
        tracing::debug!(src = %src.path(), sink = %sink.path(), "ports linked");
        Ok(())
    }

    /// Pushes a buffer out of this output port.
    ///
    /// Records the negotiated format, runs probes, then delivers to the
    /// linked peer's chain. Returns [`Error::NotLinked`] when no peer exists;
    /// fan-out elements treat that as a skippable condition.
    pub fn push(&self, buffer: AudioBuffer) -> Result<()> {
        debug_assert_eq!(self.direction, Direction::Output);
        let (mut probes, peer) = {
            let mut state = self.lock();
            state.current_format = Some(buffer.format().clone());
            (mem::take(&mut state.probes), state.peer.clone())
        };
        let mut action = ProbeAction::Pass;
        for probe in &mut probes {
            if probe(self, &buffer) == ProbeAction::Drop {
                action = ProbeAction::Drop;
            }
        }
        // Reinstall, keeping any probe added while ours were out.
        {
            let mut state = self.lock();
            probes.append(&mut state.probes);
            state.probes = probes;
        }
        if action == ProbeAction::Drop {
            return Ok(());
        }
        match peer {
            Some(peer) => peer.deliver(buffer),
            None => Err(Error::NotLinked { port: self.path() }),
        }
    }

    /// Installs this input port's end-of-stream handler.
    ///
    /// Flow elements forward the marker downstream; terminal sinks react to
    /// it (typically by notifying the control plane once their own pending
    /// data has played out). An input without a handler swallows the marker.
    pub fn set_eos_handler<F>(&self, handler: F)
    where
        F: Fn(&Port) + Send + Sync + 'static,
    {
        self.lock().eos = Some(Arc::new(handler));
    }

    /// Signals end of stream out of this output port.
    ///
    /// The marker travels the same link as buffers, so a downstream element
    /// that queues buffers sees it strictly after the last buffer.
    pub fn push_eos(&self) -> Result<()> {
        debug_assert_eq!(self.direction, Direction::Output);
        let peer = self.lock().peer.clone();
        match peer {
            Some(peer) => {
                peer.deliver_eos();
                Ok(())
            }
            None => Err(Error::NotLinked { port: self.path() }),
        }
    }

    /// Hands end of stream to this input port's handler, if one is set.
    pub fn deliver_eos(&self) {
        debug_assert_eq!(self.direction, Direction::Input);
        let handler = self.lock().eos.clone();
        if let Some(handler) = handler {
            handler(self);
        }
    }

    /// Hands a buffer to this input port's chain function.
    pub fn deliver(&self, buffer: AudioBuffer) -> Result<()> {
        debug_assert_eq!(self.direction, Direction::Input);
        let chain = {
            let mut state = self.lock();
            state.current_format = Some(buffer.format().clone());
            state.chain.clone()
        };
        match chain {
            Some(chain) => chain(self, buffer),
            None => Err(Error::NotLinked { port: self.path() }),
        }
    }
}

impl std::fmt::Debug for Port {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Port")
            .field("path", &self.path())
            .field("direction", &self.direction)
            .field("linked", &self.is_linked())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{ATTR_FORMAT, F32LE, FormatDescriptor, S16LE};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn collecting_input(received: Arc<Mutex<Vec<AudioBuffer>>>) -> Arc<Port> {
        Port::input("sinkel", "sink", move |_, buffer| {
            received.lock().unwrap().push(buffer);
            Ok(())
        })
    }

    fn f32_buffer() -> AudioBuffer {
        AudioBuffer::new(
            FormatDescriptor::raw_audio().with(ATTR_FORMAT, F32LE),
            vec![0.25; 8],
        )
    }

    #[test]
    fn push_delivers_to_linked_peer() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let src = Port::output("srcel", "src");
        let sink = collecting_input(Arc::clone(&received));
        Port::link(&src, &sink).unwrap();

        src.push(f32_buffer()).unwrap();
        assert_eq!(received.lock().unwrap().len(), 1);
        assert_eq!(
            src.current_format().unwrap().sample_format(),
            Some(F32LE)
        );
        assert_eq!(
            sink.current_format().unwrap().sample_format(),
            Some(F32LE)
        );
    }

    #[test]
    fn second_link_to_same_input_is_rejected() {
        let sink = Port::input("sinkel", "sink", |_, _| Ok(()));
        let a = Port::output("a", "src");
        let b = Port::output("b", "src");
        Port::link(&a, &sink).unwrap();
        assert!(matches!(
            Port::link(&b, &sink),
            Err(Error::AlreadyLinked { .. })
        ));
        assert!(sink.is_linked());
    }

    #[test]
    fn filtered_link_rejects_incompatible_declared_format() {
        let src = Port::output("srcel", "src");
        src.set_current_format(FormatDescriptor::raw_audio().with(ATTR_FORMAT, F32LE));
        let sink = Port::input("sinkel", "sink", |_, _| Ok(()));
        let constraint = FormatDescriptor::raw_audio().with(ATTR_FORMAT, S16LE);
        assert!(matches!(
            Port::link_filtered(&src, &sink, constraint),
            Err(Error::IncompatibleFormats { .. })
        ));
        assert!(!sink.is_linked());
    }

    #[test]
    fn push_without_link_reports_not_linked() {
        let src = Port::output("srcel", "src");
        assert!(matches!(
            src.push(f32_buffer()),
            Err(Error::NotLinked { .. })
        ));
    }

    #[test]
    fn probes_run_before_delivery_and_may_reenter() {
        let count = Arc::new(AtomicUsize::new(0));
        let probe_count = Arc::clone(&count);
        let src = Port::output("srcel", "src");
        let sink = Port::input("sinkel", "sink", |_, _| Ok(()));
        Port::link(&src, &sink).unwrap();

        src.add_probe(Box::new(move |port, _| {
            // Re-entrant read of the port while the probe runs.
            assert!(port.current_format().is_some());
            probe_count.fetch_add(1, Ordering::SeqCst);
            ProbeAction::Pass
        }));

        src.push(f32_buffer()).unwrap();
        src.push(f32_buffer()).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn dropping_probe_suppresses_delivery() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let src = Port::output("srcel", "src");
        let sink = collecting_input(Arc::clone(&received));
        Port::link(&src, &sink).unwrap();
        src.add_probe(Box::new(|_, _| ProbeAction::Drop));

        src.push(f32_buffer()).unwrap();
        assert!(received.lock().unwrap().is_empty());
    }

    #[test]
    fn eos_crosses_the_link_to_the_handler() {
        let reached = Arc::new(AtomicUsize::new(0));
        let handler_reached = Arc::clone(&reached);
        let src = Port::output("srcel", "src");
        let sink = Port::input("sinkel", "sink", |_, _| Ok(()));
        sink.set_eos_handler(move |_| {
            handler_reached.fetch_add(1, Ordering::SeqCst);
        });
        Port::link(&src, &sink).unwrap();

        src.push_eos().unwrap();
        assert_eq!(reached.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn eos_without_link_reports_not_linked() {
        let src = Port::output("srcel", "src");
        assert!(matches!(src.push_eos(), Err(Error::NotLinked { .. })));
    }

    #[test]
    fn eos_without_handler_is_swallowed() {
        let src = Port::output("srcel", "src");
        let sink = Port::input("sinkel", "sink", |_, _| Ok(()));
        Port::link(&src, &sink).unwrap();
        src.push_eos().unwrap();
    }

    #[test]
    fn ghost_input_forwards_eos_to_target() {
        let reached = Arc::new(AtomicUsize::new(0));
        let handler_reached = Arc::clone(&reached);
        let inner = Port::input("leaf", "sink", |_, _| Ok(()));
        inner.set_eos_handler(move |_| {
            handler_reached.fetch_add(1, Ordering::SeqCst);
        });
        let ghost = Port::ghost_input("bin", "sink", inner);
        let src = Port::output("srcel", "src");
        Port::link(&src, &ghost).unwrap();

        src.push_eos().unwrap();
        assert_eq!(reached.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn ghost_input_forwards_to_target() {
        let received = Arc::new(Mutex::new(Vec::new()));
        let inner = collecting_input(Arc::clone(&received));
        let ghost = Port::ghost_input("bin", "sink", inner);
        let src = Port::output("srcel", "src");
        Port::link(&src, &ghost).unwrap();

        src.push(f32_buffer()).unwrap();
        assert_eq!(received.lock().unwrap().len(), 1);
    }
}
