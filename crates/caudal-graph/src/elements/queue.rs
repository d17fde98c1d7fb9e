//! Buffering stage: decouples upstream and downstream threading contexts.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use crossbeam_channel::{Sender, bounded};

use crate::buffer::AudioBuffer;
use crate::element::Element;
use crate::port::Port;
use crate::{Error, Result};

/// Default channel capacity in buffers.
pub const DEFAULT_CAPACITY: usize = 32;

enum Item {
    Buffer(AudioBuffer),
    Eos,
    Shutdown,
}

/// A bounded queue with its own worker thread.
///
/// Buffers chained into the input port are handed to the worker over a
/// bounded channel; the worker pushes them out the output port. The bounded
/// channel gives the graph backpressure (a full queue blocks the upstream
/// thread) and moves everything downstream of the queue onto the worker
/// thread — which is why each branch after a fan-out gets its own queue.
pub struct Queue {
    name: String,
    input: Arc<Port>,
    output: Arc<Port>,
    tx: Sender<Item>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Queue {
    /// Creates a queue with the default capacity.
    pub fn new(name: &str) -> Result<Arc<Self>> {
        Self::with_capacity(name, DEFAULT_CAPACITY)
    }

    /// Creates a queue holding at most `capacity` buffers.
    pub fn with_capacity(name: &str, capacity: usize) -> Result<Arc<Self>> {
        let (tx, rx) = bounded(capacity.max(1));
        let output = Port::output(name, "src");

        let worker_output = Arc::clone(&output);
        let worker_name = name.to_string();
        let worker = std::thread::Builder::new()
            .name(format!("{name}-worker"))
            .spawn(move || {
                while let Ok(item) = rx.recv() {
                    match item {
                        Item::Buffer(buffer) => {
                            if let Err(err) = worker_output.push(buffer) {
                                // Nothing linked downstream yet; the buffer is
                                // lost but the stream keeps flowing.
                                tracing::trace!(queue = %worker_name, error = %err, "buffer dropped");
                            }
                        }
                        Item::Eos => {
                            if let Err(err) = worker_output.push_eos() {
                                tracing::trace!(queue = %worker_name, error = %err, "eos dropped");
                            }
                        }
                        Item::Shutdown => break,
                    }
                }
            })
            .map_err(|_| Error::Construction { kind: "queue" })?;

        let chain_tx = tx.clone();
        let input = Port::input(name, "sink", move |_, buffer| {
            // Blocks when the queue is full: upstream backpressure.
            let _ = chain_tx.send(Item::Buffer(buffer));
            Ok(())
        });
        let eos_tx = tx.clone();
        input.set_eos_handler(move |_| {
            // Queued behind pending buffers, so downstream sees it last.
            let _ = eos_tx.send(Item::Eos);
        });

        Ok(Arc::new(Self {
            name: name.to_string(),
            input,
            output,
            tx,
            worker: Mutex::new(Some(worker)),
        }))
    }

    /// The upstream-facing input port.
    pub fn input(&self) -> Arc<Port> {
        Arc::clone(&self.input)
    }

    /// The downstream-facing output port.
    pub fn output(&self) -> Arc<Port> {
        Arc::clone(&self.output)
    }

    fn stop_worker(&self) {
        let handle = {
            let mut guard = self
                .worker
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            guard.take()
        };
        if let Some(handle) = handle {
            let _ = self.tx.send(Item::Shutdown);
            let _ = handle.join();
        }
    }
}

impl Element for Queue {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_port(&self) -> Option<Arc<Port>> {
        Some(self.input())
    }
}

impl Drop for Queue {
    fn drop(&mut self) {
        self.stop_worker();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FormatDescriptor;

    fn buffer(tag: f32) -> AudioBuffer {
        AudioBuffer::new(FormatDescriptor::raw_audio(), vec![tag])
    }

    #[test]
    fn buffers_cross_in_order_on_the_worker_thread() {
        let queue = Queue::new("q").unwrap();
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink_received = Arc::clone(&received);
        let caller = std::thread::current().id();
        let sink = Port::input("sink", "sink", move |_, buffer| {
            assert_ne!(std::thread::current().id(), caller);
            sink_received.lock().unwrap().push(buffer.samples()[0]);
            Ok(())
        });
        Port::link(&queue.output(), &sink).unwrap();

        for i in 0..100 {
            queue.input().deliver(buffer(i as f32)).unwrap();
        }
        drop(queue); // joins the worker, flushing the channel

        let got = received.lock().unwrap();
        let expected: Vec<f32> = (0..100).map(|i| i as f32).collect();
        assert_eq!(*got, expected);
    }

    #[test]
    fn eos_follows_every_queued_buffer() {
        let queue = Queue::new("q").unwrap();
        let received = Arc::new(Mutex::new(Vec::new()));
        let sink_received = Arc::clone(&received);
        let sink = Port::input("sink", "sink", move |_, buffer| {
            sink_received.lock().unwrap().push(buffer.samples()[0]);
            Ok(())
        });
        let eos_seen_after = Arc::new(Mutex::new(None));
        let eos_received = Arc::clone(&received);
        let eos_record = Arc::clone(&eos_seen_after);
        sink.set_eos_handler(move |_| {
            *eos_record.lock().unwrap() = Some(eos_received.lock().unwrap().len());
        });
        Port::link(&queue.output(), &sink).unwrap();

        for i in 0..10 {
            queue.input().deliver(buffer(i as f32)).unwrap();
        }
        queue.input().deliver_eos();
        drop(queue); // joins the worker, flushing the channel

        assert_eq!(*eos_seen_after.lock().unwrap(), Some(10));
    }

    #[test]
    fn drop_without_downstream_does_not_hang() {
        let queue = Queue::with_capacity("q", 4).unwrap();
        for _ in 0..3 {
            queue.input().deliver(buffer(0.0)).unwrap();
        }
        drop(queue);
    }
}
