//! Pipeline lifecycle controller.

use caudal_graph::{BusMessage, EventSender, Pipeline, Result, State};

/// Why the event loop ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// The source delivered its last buffer.
    EndOfStream,
    /// An element posted a fatal error.
    Error,
}

/// Drives a pipeline from start to teardown around a blocking event loop.
///
/// The controller owns the pipeline and is the only consumer of its bus.
/// [`start`](Self::start) walks the pipeline up to `PLAYING` and fails fast
/// if any element refuses (an unavailable output device, for instance) —
/// in that case the event loop is never entered. Once running, the loop
/// blocks on the bus until a terminal message arrives; informational
/// messages are logged and skipped. [`shutdown`](Self::shutdown) releases
/// the pipeline unconditionally, on both outcomes.
pub struct Controller {
    pipeline: Pipeline,
}

impl Controller {
    /// Wraps an assembled pipeline.
    pub fn new(pipeline: Pipeline) -> Self {
        Self { pipeline }
    }

    /// The pipeline under control.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// A bus handle for posting from outside the graph — a signal handler
    /// posts `Eos` through this to request an orderly stop.
    pub fn interrupt_sender(&self) -> EventSender {
        self.pipeline.bus().sender()
    }

    /// Takes the pipeline to `PLAYING`.
    pub fn start(&self) -> Result<()> {
        tracing::info!(pipeline = self.pipeline.name(), "starting playback");
        self.pipeline.set_state(State::Playing)
    }

    /// Blocks until a terminal bus message arrives.
    ///
    /// State-change messages are only surfaced when they come from the
    /// pipeline itself; sub-element transitions are noise and are dropped.
    pub fn run_event_loop(&self) -> Termination {
        loop {
            match self.pipeline.bus().recv() {
                BusMessage::Error { source, message, debug: detail } => {
                    tracing::error!(
                        source = %source,
                        message = %message,
                        detail = detail.as_deref().unwrap_or(""),
                        "pipeline error"
                    );
                    return Termination::Error;
                }
                BusMessage::Eos => {
                    tracing::info!("end of stream reached");
                    return Termination::EndOfStream;
                }
                BusMessage::StateChanged { source, old, new, .. } => {
                    if source == self.pipeline.name() {
                        tracing::info!(from = %old, to = %new, "pipeline state changed");
                    }
                }
                _ => {}
            }
        }
    }

    /// Releases the pipeline, returning it to `NULL`.
    pub fn shutdown(self) {
        if let Err(err) = self.pipeline.set_state(State::Null) {
            tracing::warn!(error = %err, "teardown incomplete");
        }
        tracing::info!(pipeline = self.pipeline.name(), "pipeline released");
    }
}
