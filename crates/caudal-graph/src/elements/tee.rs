//! Fan-out splitter element.

use std::sync::{Arc, Mutex, PoisonError};

use crate::element::Element;
use crate::port::Port;

/// Replicates every input buffer to each requested output port.
///
/// Output ports are minted on demand with
/// [`request_output_port`](Self::request_output_port), one per downstream
/// branch. Buffer clones share their sample storage, so fan-out costs a
/// refcount, not a copy. Unlinked request ports are skipped. The tee is the
/// only element allowed more than one active output link.
pub struct Tee {
    name: String,
    input: Arc<Port>,
    outputs: Arc<Mutex<Vec<Arc<Port>>>>,
}

impl Tee {
    /// Creates a tee with no output ports yet.
    pub fn new(name: &str) -> Arc<Self> {
        let outputs: Arc<Mutex<Vec<Arc<Port>>>> = Arc::new(Mutex::new(Vec::new()));
        let chain_outputs = Arc::clone(&outputs);
        let input = Port::input(name, "sink", move |_, buffer| {
            let ports = {
                let guard = chain_outputs
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                guard.clone()
            };
            for port in ports {
                if port.is_linked() {
                    port.push(buffer.clone())?;
                }
            }
            Ok(())
        });
        let eos_outputs = Arc::clone(&outputs);
        input.set_eos_handler(move |_| {
            let ports = {
                let guard = eos_outputs.lock().unwrap_or_else(PoisonError::into_inner);
                guard.clone()
            };
            for port in ports {
                if port.is_linked() {
                    let _ = port.push_eos();
                }
            }
        });
        Arc::new(Self {
            name: name.to_string(),
            input,
            outputs,
        })
    }

    /// The upstream-facing input port.
    pub fn input(&self) -> Arc<Port> {
        Arc::clone(&self.input)
    }

    /// Mints a new replicated output port (`src_0`, `src_1`, ...).
    pub fn request_output_port(&self) -> Arc<Port> {
        let mut guard = self.outputs.lock().unwrap_or_else(PoisonError::into_inner);
        let port = Port::output(&self.name, &format!("src_{}", guard.len()));
        guard.push(Arc::clone(&port));
        port
    }

    /// Number of output ports requested so far.
    pub fn output_count(&self) -> usize {
        self.outputs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Element for Tee {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_port(&self) -> Option<Arc<Port>> {
        Some(self.input())
    }
}
