//! Pluggable audio output backend abstraction.
//!
//! The [`OutputBackend`] trait decouples the pipeline's device sink from any
//! specific platform audio API. The default implementation wraps cpal; a
//! deterministic mock backend serves tests and CI machines without audio
//! hardware.
//!
//! The trait uses boxed closures for callbacks rather than generic
//! parameters, making it object-safe so backends can be selected at runtime
//! behind `Box<dyn OutputBackend>`. Stream handles are returned as
//! [`StreamHandle`], a type-erased wrapper that stops playback on drop.

use crate::Result;

/// Audio output device information.
#[derive(Debug, Clone)]
pub struct AudioDevice {
    /// Human-readable device name.
    pub name: String,
    /// Default sample rate in Hz.
    pub default_sample_rate: u32,
}

/// Configuration for building an output stream.
#[derive(Debug, Clone)]
pub struct BackendStreamConfig {
    /// Requested sample rate in Hz.
    pub sample_rate: u32,
    /// Preferred buffer size in frames.
    pub buffer_size: u32,
    /// Number of audio channels.
    pub channels: u16,
    /// Optional device name (uses system default if `None`).
    pub device_name: Option<String>,
}

impl Default for BackendStreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            buffer_size: 512,
            channels: 2,
            device_name: None,
        }
    }
}

/// Type-erased audio stream handle.
///
/// The stream is active while this handle exists; dropping it stops
/// playback. The inner value is `Box<dyn Send>`, keeping backend types out
/// of application code.
pub struct StreamHandle {
    _inner: Box<dyn Send>,
}

impl StreamHandle {
    /// Wraps a backend-specific stream object, kept alive until drop.
    pub fn new<T: Send + 'static>(stream: T) -> Self {
        Self {
            _inner: Box::new(stream),
        }
    }
}

impl std::fmt::Debug for StreamHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandle").finish_non_exhaustive()
    }
}

/// Output callback: runs on the backend's audio thread and must fill the
/// buffer with interleaved f32 samples. Must not block, allocate, or lock
/// for long; communicate with the rest of the pipeline through lock-free or
/// bounded structures.
pub type OutputCallback = Box<dyn FnMut(&mut [f32]) + Send>;

/// Error callback: invoked with a human-readable message when the backend
/// reports a streaming error.
pub type ErrorCallback = Box<dyn FnMut(&str) + Send>;

/// Pluggable audio output backend.
pub trait OutputBackend: Send {
    /// Human-readable backend name (e.g. "cpal", "mock").
    fn name(&self) -> &'static str;

    /// Lists available output devices.
    fn list_devices(&self) -> Result<Vec<AudioDevice>>;

    /// The default output device, if any.
    fn default_output_device(&self) -> Result<Option<AudioDevice>>;

    /// Builds and starts an output stream.
    ///
    /// The `callback` is invoked on the audio thread with a buffer to fill;
    /// `error_callback` receives asynchronous stream errors. The returned
    /// handle keeps the stream alive.
    fn build_output_stream(
        &self,
        config: &BackendStreamConfig,
        callback: OutputCallback,
        error_callback: ErrorCallback,
    ) -> Result<StreamHandle>;
}
