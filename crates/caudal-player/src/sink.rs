//! Audio device sink element.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use caudal_graph::{Element, Error, EventBus, Port, Result, State};
use caudal_io::{BackendStreamConfig, ErrorCallback, OutputBackend, OutputCallback, StreamHandle};
use crossbeam_channel::{Receiver, Sender, bounded};

/// Buffers in flight between the chain function and the audio callback.
const CHANNEL_CAPACITY: usize = 8;

/// Terminal sink rendering buffers on an audio output device.
///
/// Construction is cheap and cannot fail; the output stream is opened during
/// the `NULL → READY` transition, so an unavailable device surfaces as a
/// startup state-transition error before any data flows. Buffers chained in
/// during `PLAYING` cross a bounded channel to the backend's audio callback,
/// which paces the upstream branch in real time: a full channel blocks the
/// branch's worker thread until the device catches up.
pub struct DeviceSink {
    name: String,
    input: Arc<Port>,
    backend: Mutex<Box<dyn OutputBackend>>,
    stream_config: BackendStreamConfig,
    stream: Mutex<Option<StreamHandle>>,
    tx: Sender<Vec<f32>>,
    rx: Mutex<Option<Receiver<Vec<f32>>>>,
}

impl DeviceSink {
    /// Creates a device sink over the given backend.
    pub fn new(
        name: &str,
        backend: Box<dyn OutputBackend>,
        stream_config: BackendStreamConfig,
    ) -> Arc<Self> {
        let (tx, rx): (Sender<Vec<f32>>, Receiver<Vec<f32>>) = bounded(CHANNEL_CAPACITY);
        let chain_tx = tx.clone();
        let input = Port::input(name, "sink", move |port, buffer| {
            if chain_tx.send(buffer.samples().to_vec()).is_err() {
                // Stream already torn down; late buffers are dropped.
                tracing::trace!(sink = %port.element_name(), "buffer after stream close");
            }
            Ok(())
        });
        Arc::new(Self {
            name: name.to_string(),
            input,
            backend: Mutex::new(backend),
            stream_config,
            stream: Mutex::new(None),
            tx,
            rx: Mutex::new(Some(rx)),
        })
    }

    /// The upstream-facing input port.
    pub fn input(&self) -> Arc<Port> {
        Arc::clone(&self.input)
    }

    fn lock_stream(&self) -> MutexGuard<'_, Option<StreamHandle>> {
        self.stream.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks until the audio callback has pulled every queued block, then
    /// waits one more callback period so the last block finishes rendering.
    ///
    /// The wait is bounded: a stalled device or an already-closed stream must
    /// not wedge the branch worker that calls this at end-of-stream.
    pub fn wait_drained(&self) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while !self.tx.is_empty() {
            if self.lock_stream().is_none() || Instant::now() >= deadline {
                return;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        let period = Duration::from_secs_f64(
            f64::from(self.stream_config.buffer_size)
                / f64::from(self.stream_config.sample_rate.max(1)),
        );
        std::thread::sleep(period);
    }

    fn open_stream(&self, bus: &EventBus) -> Result<()> {
        let mut stream = self.lock_stream();
        if stream.is_some() {
            return Ok(());
        }

        // The receiver moves into the callback and dies with the stream, so
        // chain sends after close fail instead of blocking a branch worker.
        let rx = self
            .rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(|| Error::StateTransition {
                element: self.name.clone(),
                target: State::Ready,
                reason: "sink already ran once".to_string(),
            })?;
        let mut pending: VecDeque<f32> = VecDeque::new();
        let callback: OutputCallback = Box::new(move |data| {
            for slot in data.iter_mut() {
                if pending.is_empty()
                    && let Ok(block) = rx.try_recv()
                {
                    pending.extend(block);
                }
                // Underruns render silence rather than stalling the device.
                *slot = pending.pop_front().unwrap_or(0.0);
            }
        });

        let sender = bus.sender();
        let error_source = self.name.clone();
        let error_callback: ErrorCallback = Box::new(move |message| {
            sender.post_error(&error_source, "audio stream failure", Some(message.to_string()));
        });

        let backend = self.backend.lock().unwrap_or_else(PoisonError::into_inner);
        let handle = backend
            .build_output_stream(&self.stream_config, callback, error_callback)
            .map_err(|err| Error::StateTransition {
                element: self.name.clone(),
                target: State::Ready,
                reason: err.to_string(),
            })?;
        tracing::info!(
            sink = %self.name,
            backend = backend.name(),
            sample_rate = self.stream_config.sample_rate,
            "output stream opened"
        );
        *stream = Some(handle);
        Ok(())
    }
}

impl Element for DeviceSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_port(&self) -> Option<Arc<Port>> {
        Some(self.input())
    }

    fn transition(&self, from: State, to: State, bus: &EventBus) -> Result<()> {
        match (from, to) {
            (State::Null, State::Ready) => self.open_stream(bus),
            (State::Ready, State::Null) => {
                if self.lock_stream().take().is_some() {
                    tracing::info!(sink = %self.name, "output stream closed");
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
