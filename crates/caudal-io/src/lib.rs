//! Audio device and file I/O for the Caudal pipeline.
//!
//! This crate provides:
//!
//! - **Pluggable output backends**: the [`OutputBackend`] trait with a
//!   cpal-based default ([`CpalBackend`]) and a deterministic
//!   [`MockBackend`] for tests
//! - **WAV reading**: [`WavBlockReader`] for block-wise decode of WAV files
//!
//! The backend trait keeps platform audio APIs out of the graph and player
//! code: sinks hold a `Box<dyn OutputBackend>` and never see cpal types.

mod backend;
mod cpal_backend;
mod mock_backend;
mod wav;

pub use backend::{
    AudioDevice, BackendStreamConfig, ErrorCallback, OutputBackend, OutputCallback, StreamHandle,
};
pub use cpal_backend::CpalBackend;
pub use mock_backend::MockBackend;
pub use wav::{WavBlockReader, WavInfo, read_wav_info};

/// Error types for audio I/O operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Audio stream setup or runtime error.
    #[error("audio stream error: {0}")]
    Stream(String),

    /// No audio output device available on the system.
    #[error("no audio output device available")]
    NoDevice,

    /// The requested audio device was not found.
    #[error("device not found: {0}")]
    DeviceNotFound(String),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for audio I/O operations.
pub type Result<T> = std::result::Result<T, Error>;
