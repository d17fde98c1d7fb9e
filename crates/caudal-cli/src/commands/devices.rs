//! The `devices` subcommand.

use anyhow::{Context, Result};
use caudal_io::{CpalBackend, OutputBackend};

/// Prints the available output devices, marking the default.
pub fn run() -> Result<()> {
    let backend = CpalBackend::new();
    let devices = backend.list_devices().context("listing output devices")?;
    if devices.is_empty() {
        println!("No audio output devices found.");
        return Ok(());
    }

    let default = backend
        .default_output_device()
        .context("querying default output device")?
        .map(|d| d.name);

    println!("Audio output devices ({}):", backend.name());
    for device in devices {
        let marker = if Some(&device.name) == default.as_ref() {
            " (default)"
        } else {
            ""
        };
        println!("  {} [{} Hz]{marker}", device.name, device.default_sample_rate);
    }
    Ok(())
}
