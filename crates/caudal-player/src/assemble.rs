//! Pipeline assembly: the composite audio sink and the full player graph.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use caudal_graph::elements::{Convert, FakeSink, Queue, Tee};
use caudal_graph::format::ATTR_FORMAT;
use caudal_graph::probe::install_branch_observer;
use caudal_graph::{
    Bin, BusMessage, Element, Error, EventSender, FormatDescriptor, Pipeline, Port, Result,
};
use caudal_io::OutputBackend;

use crate::config::PlayerConfig;
use crate::controller::Controller;
use crate::linker::PadLinker;
use crate::sink::DeviceSink;
use crate::source::WavSource;

/// Posts a single `Eos` on the bus once every terminal sink has seen
/// end-of-stream.
///
/// The marker fans out at the tee and reaches the two branch sinks
/// independently; reporting on the first arrival would cut off whichever
/// branch is still playing out.
struct EosFanIn {
    remaining: AtomicUsize,
    events: EventSender,
}

impl EosFanIn {
    fn new(branches: usize, events: EventSender) -> Arc<Self> {
        Arc::new(Self {
            remaining: AtomicUsize::new(branches),
            events,
        })
    }

    fn branch_done(&self) {
        if self.remaining.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.events.post(BusMessage::Eos);
        }
    }
}

/// Builds the composite audio sink bin.
///
/// Internally: an ingress queue feeding a converter, a tee fanning out to two
/// branches, each branch a queue, a converter and a terminal sink. The
/// monitoring branch's converter-to-sink link carries a constraint forcing
/// the configured sample encoding (so its converter quantizes); the playback
/// branch's link only requires raw audio, keeping the source's native
/// encoding. A counting observer sits on each branch converter's output,
/// where the branch's final format is visible. The ingress queue's input is
/// exposed as the bin's own port, so from the outside this is one sink
/// element.
///
/// End-of-stream arrives in-band behind the last buffer. Each branch sink
/// reports it to a shared fan-in, which posts `Eos` on the bus only once
/// both branches have finished — the device sink drains its channel first,
/// so nothing still queued toward the hardware is cut off.
pub fn build_audio_sink(
    name: &str,
    config: &PlayerConfig,
    backend: Box<dyn OutputBackend>,
    events: EventSender,
) -> Result<Bin> {
    let ingress = Queue::with_capacity("ingress", config.queue_capacity)?;
    let convert = Convert::new("convert");
    let tee = Tee::new("tee");

    let monitor_queue = Queue::with_capacity("monitor-queue", config.queue_capacity)?;
    let monitor_convert = Convert::new("monitor-convert");
    let monitor_sink = FakeSink::new("monitor-sink", true);

    let playback_queue = Queue::with_capacity("playback-queue", config.queue_capacity)?;
    let playback_convert = Convert::new("playback-convert");
    let device_sink = DeviceSink::new("device-sink", backend, config.stream_config());

    Port::link(&ingress.output(), &convert.input())?;
    Port::link(&convert.output(), &tee.input())?;
    Port::link(&tee.request_output_port(), &monitor_queue.input())?;
    Port::link(&tee.request_output_port(), &playback_queue.input())?;
    Port::link(&monitor_queue.output(), &monitor_convert.input())?;
    Port::link(&playback_queue.output(), &playback_convert.input())?;

    install_branch_observer(&monitor_convert.output(), "monitor");
    install_branch_observer(&playback_convert.output(), "playback");

    let fan_in = EosFanIn::new(2, events);
    let monitor_done = Arc::clone(&fan_in);
    monitor_sink.input().set_eos_handler(move |_| monitor_done.branch_done());
    let playback_done = fan_in;
    let drain_sink = Arc::downgrade(&device_sink);
    device_sink.input().set_eos_handler(move |_| {
        if let Some(sink) = drain_sink.upgrade() {
            sink.wait_drained();
        }
        playback_done.branch_done();
    });

    let monitor_constraint =
        FormatDescriptor::raw_audio().with(ATTR_FORMAT, config.monitor_format.as_str());
    Port::link_filtered(&monitor_convert.output(), &monitor_sink.input(), monitor_constraint)?;
    Port::link_filtered(
        &playback_convert.output(),
        &device_sink.input(),
        FormatDescriptor::raw_audio(),
    )?;

    let mut bin = Bin::new(name);
    bin.set_ghost_input(ingress.input());
    // Add order is upstream to downstream: upward transitions walk it in
    // reverse, so sinks allocate their resources first.
    bin.add(ingress);
    bin.add(convert);
    bin.add(tee);
    bin.add(monitor_queue);
    bin.add(monitor_convert);
    bin.add(monitor_sink);
    bin.add(playback_queue);
    bin.add(playback_convert);
    bin.add(device_sink);
    tracing::debug!(bin = name, children = bin.child_count(), "audio sink assembled");
    Ok(bin)
}

/// Assembles the complete player: source, composite sink, dynamic linker.
///
/// Returns the lifecycle controller and the linker (kept alive by the
/// source's port-added callback; returned so callers can inspect the link
/// outcome). The source's output is not linked yet — that happens on the
/// streaming thread once the file's format is known.
pub fn build_player(
    path: &Path,
    config: &PlayerConfig,
    backend: Box<dyn OutputBackend>,
) -> Result<(Controller, Arc<PadLinker>)> {
    let mut pipeline = Pipeline::new("player");
    let source = WavSource::new("wav-source", path, config.buffer_frames);
    let sink: Arc<Bin> = Arc::new(build_audio_sink(
        "audio-sink",
        config,
        backend,
        pipeline.bus().sender(),
    )?);
    let ghost = sink
        .input_port()
        .ok_or(Error::Construction { kind: "audio-sink" })?;

    let linker = PadLinker::new(ghost);
    let on_added = Arc::clone(&linker);
    source.connect_port_added(move |port| on_added.handle_port_added(port));

    pipeline.add(source);
    pipeline.add(sink);
    Ok((Controller::new(pipeline), linker))
}
