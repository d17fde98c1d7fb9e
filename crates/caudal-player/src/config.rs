//! Player configuration.

use std::path::Path;

use caudal_io::BackendStreamConfig;
use serde::Deserialize;

/// Configuration for an assembled playback pipeline.
///
/// Loadable from a TOML file; every field has a default, so a partial file
/// (or none at all) works.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlayerConfig {
    /// Output device name, matched case-insensitively against available
    /// devices. `None` selects the system default.
    pub device: Option<String>,
    /// Output stream sample rate in Hz.
    pub sample_rate: u32,
    /// Output stream channel count.
    pub channels: u16,
    /// Frames per buffer pulled from the source file.
    pub buffer_frames: usize,
    /// Capacity of each buffering stage, in buffers.
    pub queue_capacity: usize,
    /// Sample encoding forced onto the monitoring branch.
    pub monitor_format: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: 44100,
            channels: 2,
            buffer_frames: 1024,
            queue_capacity: 32,
            monitor_format: caudal_graph::format::S16LE.to_string(),
        }
    }
}

impl PlayerConfig {
    /// Loads a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// The backend stream configuration for the device sink.
    pub fn stream_config(&self) -> BackendStreamConfig {
        BackendStreamConfig {
            sample_rate: self.sample_rate,
            buffer_size: self.buffer_frames as u32,
            channels: self.channels,
            device_name: self.device.clone(),
        }
    }
}

/// Errors loading a player configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("could not read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML or names unknown fields.
    #[error("could not parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}
