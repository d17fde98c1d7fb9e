//! Composite elements.

use std::sync::Arc;

use crate::element::Element;
use crate::event::EventBus;
use crate::pipeline::State;
use crate::port::Port;
use crate::Result;

/// A container element owning a private sub-graph.
///
/// The bin exclusively owns its children: dropping the bin drops them, which
/// in turn joins their worker threads. Externally the bin exposes one virtual
/// input port (a ghost of an internal port), so linking code treats it like
/// any atomic element. Built mutably, then frozen behind `Arc` before being
/// added to a pipeline.
pub struct Bin {
    name: String,
    children: Vec<Arc<dyn Element>>,
    ghost_input: Option<Arc<Port>>,
}

impl Bin {
    /// Creates an empty bin.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            children: Vec::new(),
            ghost_input: None,
        }
    }

    /// Adds a child element. Add order matters: downward transitions walk it
    /// forward, upward transitions walk it in reverse (sinks last added,
    /// transitioned first).
    pub fn add(&mut self, child: Arc<dyn Element>) {
        self.children.push(child);
    }

    /// Exposes `target` (an input port of some child) as this bin's own
    /// input, via a forwarding ghost port.
    pub fn set_ghost_input(&mut self, target: Arc<Port>) {
        self.ghost_input = Some(Port::ghost_input(&self.name, "sink", target));
    }

    /// Number of owned children.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }
}

impl Element for Bin {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_port(&self) -> Option<Arc<Port>> {
        self.ghost_input.as_ref().map(Arc::clone)
    }

    fn transition(&self, from: State, to: State, bus: &EventBus) -> Result<()> {
        if to > from {
            for child in self.children.iter().rev() {
                child.transition(from, to, bus)?;
            }
        } else {
            for child in &self.children {
                child.transition(from, to, bus)?;
            }
        }
        Ok(())
    }
}
