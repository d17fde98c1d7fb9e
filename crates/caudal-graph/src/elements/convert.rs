//! Sample-format conversion element.

use std::sync::Arc;

use crate::buffer::AudioBuffer;
use crate::element::Element;
use crate::format::{FormatDescriptor, S16LE};
use crate::port::Port;

/// Converts each buffer to whatever format its downstream link demands.
///
/// The target descriptor is the incoming format with the output link's
/// constraint attributes applied over it. With no constraint — or a
/// constraint that only names the kind — the buffer passes through untouched,
/// which is how the playback branch keeps the source's native encoding while
/// the monitoring branch is forced to `S16LE`.
pub struct Convert {
    name: String,
    input: Arc<Port>,
    output: Arc<Port>,
}

impl Convert {
    /// Creates a converter.
    pub fn new(name: &str) -> Arc<Self> {
        let output = Port::output(name, "src");
        let chain_output = Arc::clone(&output);
        let input = Port::input(name, "sink", move |_, buffer| {
            let target = match chain_output.link_constraint() {
                Some(constraint) => constraint.merged_into(buffer.format()),
                None => buffer.format().clone(),
            };
            chain_output.push(convert_buffer(&buffer, target))
        });
        let eos_output = Arc::clone(&output);
        input.set_eos_handler(move |port| {
            if let Err(err) = eos_output.push_eos() {
                tracing::trace!(convert = %port.element_name(), error = %err, "eos dropped");
            }
        });
        Arc::new(Self {
            name: name.to_string(),
            input,
            output,
        })
    }

    /// The upstream-facing input port.
    pub fn input(&self) -> Arc<Port> {
        Arc::clone(&self.input)
    }

    /// The downstream-facing output port.
    pub fn output(&self) -> Arc<Port> {
        Arc::clone(&self.output)
    }
}

impl Element for Convert {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_port(&self) -> Option<Arc<Port>> {
        Some(self.input())
    }
}

/// Converts one buffer to the target descriptor.
///
/// Changing the encoding to `S16LE` quantizes the samples through 16 bits so
/// the relabeled block really carries 16-bit-valued audio; any other
/// relabeling keeps the sample values (the internal representation is
/// normalized f32 either way).
fn convert_buffer(buffer: &AudioBuffer, target: FormatDescriptor) -> AudioBuffer {
    if target == *buffer.format() {
        return buffer.clone();
    }
    let needs_quantize =
        target.sample_format() == Some(S16LE) && buffer.format().sample_format() != Some(S16LE);
    if needs_quantize {
        let quantized: Vec<f32> = buffer
            .samples()
            .iter()
            .map(|&s| {
                let clamped = s.clamp(-1.0, 1.0);
                let q = (clamped * f32::from(i16::MAX)).round() as i16;
                f32::from(q) / f32::from(i16::MAX)
            })
            .collect();
        AudioBuffer::new(target, quantized)
    } else {
        buffer.relabeled(target)
    }
}
