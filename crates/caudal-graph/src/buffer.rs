//! Audio buffers flowing through the graph.

use std::sync::Arc;
use std::time::Duration;

use crate::format::FormatDescriptor;

/// A block of interleaved audio samples plus the format describing them.
///
/// Samples are stored as normalized f32 regardless of the negotiated wire
/// encoding; the descriptor says what encoding the block represents (a
/// converter targeting `S16LE` quantizes the values through 16 bits before
/// relabeling). The sample storage is shared, so cloning a buffer for fan-out
/// copies a pointer, not audio data.
#[derive(Clone, Debug)]
pub struct AudioBuffer {
    format: FormatDescriptor,
    samples: Arc<[f32]>,
}

impl AudioBuffer {
    /// Wraps a block of interleaved samples with its format.
    pub fn new(format: FormatDescriptor, samples: Vec<f32>) -> Self {
        Self {
            format,
            samples: samples.into(),
        }
    }

    /// The format describing this block.
    pub fn format(&self) -> &FormatDescriptor {
        &self.format
    }

    /// The interleaved sample data.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Returns this buffer with a different descriptor and the same samples.
    pub fn relabeled(&self, format: FormatDescriptor) -> Self {
        Self {
            format,
            samples: Arc::clone(&self.samples),
        }
    }

    /// Frame count, using the descriptor's channel count (1 if absent).
    pub fn frames(&self) -> usize {
        let channels = self.format.channels().unwrap_or(1).max(1) as usize;
        self.samples.len() / channels
    }

    /// Wall-clock duration of this block, when the descriptor carries a rate.
    ///
    /// Used by synchronized sinks to pace consumption against the pipeline
    /// clock.
    pub fn duration(&self) -> Option<Duration> {
        let rate = self.format.rate()?;
        if rate <= 0 {
            return None;
        }
        Some(Duration::from_secs_f64(self.frames() as f64 / rate as f64))
    }
}
