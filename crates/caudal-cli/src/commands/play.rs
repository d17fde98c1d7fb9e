//! The `play` subcommand.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use caudal_graph::BusMessage;
use caudal_io::CpalBackend;
use caudal_player::{PlayerConfig, Termination, build_player};
use clap::Args;

/// Arguments for `caudal play`.
#[derive(Args)]
pub struct PlayArgs {
    /// Path to the WAV file to play.
    pub file: PathBuf,

    /// Output device name (case-insensitive partial match).
    #[arg(long)]
    pub device: Option<String>,

    /// Path to a TOML configuration file.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Plays a file until end of stream, error, or Ctrl-C.
pub fn run(args: PlayArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => PlayerConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => PlayerConfig::default(),
    };
    if args.device.is_some() {
        config.device = args.device;
    }

    let (controller, _linker) = build_player(&args.file, &config, Box::new(CpalBackend::new()))
        .context("assembling playback pipeline")?;

    let interrupt = controller.interrupt_sender();
    ctrlc::set_handler(move || {
        tracing::info!("interrupt received, stopping");
        interrupt.post(BusMessage::Eos);
    })
    .context("installing interrupt handler")?;

    if let Err(err) = controller.start() {
        controller.shutdown();
        return Err(err).context("starting playback");
    }
    let termination = controller.run_event_loop();
    controller.shutdown();

    match termination {
        Termination::EndOfStream => Ok(()),
        Termination::Error => bail!("playback failed, see log for details"),
    }
}
