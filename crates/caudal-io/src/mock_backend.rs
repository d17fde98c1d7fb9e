//! Deterministic mock backend for tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::backend::{
    AudioDevice, BackendStreamConfig, ErrorCallback, OutputBackend, OutputCallback, StreamHandle,
};
use crate::{Error, Result};

/// A backend with no hardware behind it.
///
/// Streams built on it run a consumer thread that polls the output callback,
/// counting every pulled sample, so sinks feeding a mock stream experience
/// realistic draining without a device. Constructed with
/// [`failing`](Self::failing), the backend refuses to build streams — that is
/// how tests drive the "device unavailable" startup failure path.
pub struct MockBackend {
    fail: bool,
    samples_pulled: Arc<AtomicUsize>,
}

impl MockBackend {
    /// A working mock backend.
    pub fn new() -> Self {
        Self {
            fail: false,
            samples_pulled: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A backend whose `build_output_stream` always fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            samples_pulled: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared counter of samples pulled through all streams built on this
    /// backend.
    pub fn samples_pulled(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.samples_pulled)
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Stops and joins the consumer thread when the stream handle drops.
struct MockStream {
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl Drop for MockStream {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl OutputBackend for MockBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn list_devices(&self) -> Result<Vec<AudioDevice>> {
        Ok(vec![AudioDevice {
            name: "mock-output".to_string(),
            default_sample_rate: 44100,
        }])
    }

    fn default_output_device(&self) -> Result<Option<AudioDevice>> {
        Ok(self.list_devices()?.into_iter().next())
    }

    fn build_output_stream(
        &self,
        config: &BackendStreamConfig,
        mut callback: OutputCallback,
        _error_callback: ErrorCallback,
    ) -> Result<StreamHandle> {
        if self.fail {
            return Err(Error::DeviceNotFound(
                config
                    .device_name
                    .clone()
                    .unwrap_or_else(|| "default".to_string()),
            ));
        }
        let stop = Arc::new(AtomicBool::new(false));
        let worker_stop = Arc::clone(&stop);
        let pulled = Arc::clone(&self.samples_pulled);
        let block = (config.buffer_size as usize * config.channels as usize).max(1);
        let worker = std::thread::Builder::new()
            .name("mock-output".to_string())
            .spawn(move || {
                let mut buffer = vec![0.0f32; block];
                while !worker_stop.load(Ordering::SeqCst) {
                    callback(&mut buffer);
                    pulled.fetch_add(buffer.len(), Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(1));
                }
            })
            .map_err(|e| Error::Stream(e.to_string()))?;

        Ok(StreamHandle::new(MockStream {
            stop,
            worker: Some(worker),
        }))
    }
}
