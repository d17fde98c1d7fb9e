//! Dynamic port linking.

use std::sync::{Arc, Mutex, PoisonError};

use caudal_graph::format::RAW_AUDIO;
use caudal_graph::{FormatDescriptor, Port};

/// Whether the linker's downstream input has been connected yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkState {
    /// No source port accepted yet.
    Unlinked,
    /// Exactly one source port linked; further announcements are ignored.
    Linked,
}

struct LinkerState {
    state: LinkState,
    negotiated: Option<FormatDescriptor>,
}

/// Reacts to dynamically announced source ports by linking the first
/// compatible one to a fixed downstream input.
///
/// The linker runs on whatever thread announces the port. It is a two-state
/// machine: once linked it ignores every later announcement, so a source
/// exposing several streams connects exactly one. Ports carrying no format
/// or a non-audio format are skipped without error; a failed link attempt is
/// logged and leaves the linker ready for the next announcement.
pub struct PadLinker {
    sink: Arc<Port>,
    state: Mutex<LinkerState>,
}

impl PadLinker {
    /// Creates a linker targeting the given input port.
    pub fn new(sink: Arc<Port>) -> Arc<Self> {
        Arc::new(Self {
            sink,
            state: Mutex::new(LinkerState {
                state: LinkState::Unlinked,
                negotiated: None,
            }),
        })
    }

    /// Current link state.
    pub fn state(&self) -> LinkState {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .state
    }

    /// The format of the linked source port, once linked.
    pub fn negotiated_format(&self) -> Option<FormatDescriptor> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .negotiated
            .clone()
    }

    /// Handles one announced source port.
    pub fn handle_port_added(&self, port: &Arc<Port>) {
        tracing::info!(port = %port.path(), "received new output port");
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.state == LinkState::Linked || self.sink.is_linked() {
            tracing::info!(port = %port.path(), "already linked, ignoring");
            return;
        }
        let Some(format) = port.current_format() else {
            tracing::warn!(port = %port.path(), "port declares no format, ignoring");
            return;
        };
        if !format.kind().starts_with(RAW_AUDIO) {
            tracing::info!(port = %port.path(), kind = format.kind(), "not raw audio, ignoring");
            return;
        }
        match Port::link(port, &self.sink) {
            Ok(()) => {
                tracing::info!(port = %port.path(), format = %format, "link succeeded");
                state.state = LinkState::Linked;
                state.negotiated = Some(format);
            }
            Err(err) => {
                // Non-fatal: the graph simply stays without this stream.
                tracing::warn!(port = %port.path(), error = %err, "link failed");
            }
        }
    }
}
