//! WAV file source element with dynamically announced output.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use caudal_graph::format::{ATTR_CHANNELS, ATTR_FORMAT, ATTR_RATE, F32LE};
use caudal_graph::{AudioBuffer, BusMessage, Element, EventBus, FormatDescriptor, Port, Result, State};
use caudal_io::{WavBlockReader, WavInfo};

/// Callback invoked when the source announces an output port.
pub type PortAddedFn = Box<dyn Fn(&Arc<Port>) + Send + Sync>;

/// Streams a WAV file into the graph, block by block.
///
/// The output port is not announced up front: like a demuxer, the source
/// only knows its stream type after parsing the container. On the transition
/// to `PLAYING` a streaming thread opens the file, declares the parsed format
/// on the output port, fires every registered port-added callback (this is
/// where dynamic linking happens), and then pushes buffers until the file is
/// exhausted — at which point it sends end-of-stream down the same link, so
/// the marker arrives downstream only after every buffer ahead of it.
///
/// Failures never propagate synchronously from the streaming thread; an
/// unreadable file becomes an `Error` bus message.
pub struct WavSource {
    name: String,
    path: PathBuf,
    frames_per_block: usize,
    output: Arc<Port>,
    port_added: Arc<Mutex<Vec<PortAddedFn>>>,
    stop: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl WavSource {
    /// Creates a source for the given file. Nothing is opened yet.
    pub fn new(name: &str, path: impl Into<PathBuf>, frames_per_block: usize) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            path: path.into(),
            frames_per_block: frames_per_block.max(1),
            output: Port::output(name, "src_0"),
            port_added: Arc::new(Mutex::new(Vec::new())),
            stop: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        })
    }

    /// Registers a callback fired when the output port is announced.
    ///
    /// Register before starting the pipeline; callbacks run on the streaming
    /// thread, after the port's format is declared.
    pub fn connect_port_added<F>(&self, callback: F)
    where
        F: Fn(&Arc<Port>) + Send + Sync + 'static,
    {
        self.port_added
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Box::new(callback));
    }

    fn spawn_worker(&self, bus: &EventBus) -> Result<()> {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        if worker.is_some() {
            return Ok(());
        }
        let name = self.name.clone();
        let path = self.path.clone();
        let frames = self.frames_per_block;
        let output = Arc::clone(&self.output);
        let port_added = Arc::clone(&self.port_added);
        let stop = Arc::clone(&self.stop);
        let sender = bus.sender();
        let handle = std::thread::Builder::new()
            .name(format!("{name}-stream"))
            .spawn(move || {
                let mut reader = match WavBlockReader::open(&path) {
                    Ok(reader) => reader,
                    Err(err) => {
                        sender.post_error(
                            &name,
                            format!("could not open {}", path.display()),
                            Some(err.to_string()),
                        );
                        return;
                    }
                };
                let info = reader.info();
                let format = native_descriptor(&info);
                output.set_current_format(format.clone());
                tracing::info!(source = %name, format = %format, "output port announced");
                for callback in port_added.lock().unwrap_or_else(PoisonError::into_inner).iter() {
                    callback(&output);
                }

                let block_duration =
                    Duration::from_secs_f64(frames as f64 / f64::from(info.sample_rate.max(1)));
                loop {
                    if stop.load(Ordering::SeqCst) {
                        return;
                    }
                    match reader.next_block(frames) {
                        Ok(Some(samples)) => {
                            let buffer = AudioBuffer::new(format.clone(), samples);
                            if let Err(err) = output.push(buffer) {
                                // Nobody accepted the stream; keep nominal
                                // pacing instead of spinning.
                                tracing::trace!(source = %name, error = %err, "buffer dropped");
                                std::thread::sleep(block_duration);
                            }
                        }
                        Ok(None) => {
                            tracing::info!(source = %name, "file exhausted");
                            // End-of-stream travels in-band behind the last
                            // buffer, so queued audio plays out before the
                            // control plane hears about it.
                            if output.push_eos().is_err() {
                                // Never linked; nothing is queued downstream.
                                sender.post(BusMessage::Eos);
                            }
                            return;
                        }
                        Err(err) => {
                            sender.post_error(&name, "read failed", Some(err.to_string()));
                            return;
                        }
                    }
                }
            })
            .map_err(|_| caudal_graph::Error::Construction { kind: "wav-source" })?;
        *worker = Some(handle);
        Ok(())
    }

    fn join_worker(&self) {
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

/// The format descriptor matching a WAV header, with the file's own sample
/// encoding (`S16LE` for 16-bit integer files, `F32LE` for float files, and
/// so on).
fn native_descriptor(info: &WavInfo) -> FormatDescriptor {
    let encoding = if info.float {
        F32LE.to_string()
    } else {
        format!("S{}LE", info.bits_per_sample)
    };
    FormatDescriptor::raw_audio()
        .with(ATTR_FORMAT, encoding)
        .with(ATTR_RATE, info.sample_rate)
        .with(ATTR_CHANNELS, i64::from(info.channels))
}

impl Element for WavSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn transition(&self, from: State, to: State, bus: &EventBus) -> Result<()> {
        match (from, to) {
            (State::Paused, State::Playing) => self.spawn_worker(bus),
            (State::Paused, State::Ready) => {
                self.stop.store(true, Ordering::SeqCst);
                Ok(())
            }
            (State::Ready, State::Null) => {
                self.stop.store(true, Ordering::SeqCst);
                self.join_worker();
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

impl Drop for WavSource {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        self.join_worker();
    }
}
