//! File playback pipeline for Caudal.
//!
//! This crate assembles the graph primitives from `caudal-graph` and the
//! backends from `caudal-io` into a runnable player:
//!
//! - [`WavSource`] streams a WAV file, announcing its output port only after
//!   the header is parsed;
//! - [`build_audio_sink`] wires the composite sink — an ingress queue, a
//!   converter and a tee fanning out into a monitoring branch (forced sample
//!   encoding, synchronized discard) and a playback branch (native encoding,
//!   audio device);
//! - [`PadLinker`] connects the two when the source's format appears;
//! - [`Controller`] drives the lifecycle and consumes the event bus until
//!   end of stream or error.
//!
//! [`build_player`] puts all of it together from a [`PlayerConfig`].

mod assemble;
mod config;
mod controller;
mod linker;
mod sink;
mod source;

pub use assemble::{build_audio_sink, build_player};
pub use config::{ConfigError, PlayerConfig};
pub use controller::{Controller, Termination};
pub use linker::{LinkState, PadLinker};
pub use sink::DeviceSink;
pub use source::WavSource;
