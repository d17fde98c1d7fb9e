//! Discarding terminal sink.

use std::sync::Arc;

use crate::element::Element;
use crate::port::Port;

/// A sink that consumes and discards every buffer.
///
/// With `sync` enabled it still paces itself against the pipeline clock by
/// sleeping each buffer's duration before discarding it, so a monitoring
/// branch ending here keeps the same timing as the audible branch it is
/// compared against.
pub struct FakeSink {
    name: String,
    input: Arc<Port>,
}

impl FakeSink {
    /// Creates a fake sink; `sync` selects clock-paced consumption.
    pub fn new(name: &str, sync: bool) -> Arc<Self> {
        let input = Port::input(name, "sink", move |port, buffer| {
            if sync && let Some(duration) = buffer.duration() {
                std::thread::sleep(duration);
            }
            tracing::trace!(sink = %port.element_name(), frames = buffer.frames(), "buffer discarded");
            Ok(())
        });
        Arc::new(Self {
            name: name.to_string(),
            input,
        })
    }

    /// The upstream-facing input port.
    pub fn input(&self) -> Arc<Port> {
        Arc::clone(&self.input)
    }
}

impl Element for FakeSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_port(&self) -> Option<Arc<Port>> {
        Some(self.input())
    }
}
