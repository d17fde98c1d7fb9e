//! End-to-end graph tests: the full two-branch topology with live queues.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use caudal_graph::elements::{Convert, Queue, Tee};
use caudal_graph::format::{ATTR_CHANNELS, ATTR_FORMAT, ATTR_RATE, F32LE, S16LE};
use caudal_graph::probe::install_branch_observer;
use caudal_graph::{AudioBuffer, FormatDescriptor, Port, ProbeAction};
use std::sync::Mutex;

struct Branch {
    queue: Arc<Queue>,
    convert: Arc<Convert>,
    delivered: Arc<AtomicUsize>,
    formats: Arc<Mutex<Vec<Option<String>>>>,
}

/// queue -> convert, with `constraint` on the convert's output link, ending
/// in a sink that counts deliveries and records negotiated sample formats.
fn build_branch(name: &str, constraint: FormatDescriptor) -> Branch {
    let queue = Queue::with_capacity(&format!("{name}-queue"), 8).unwrap();
    let convert = Convert::new(&format!("{name}-convert"));
    Port::link(&queue.output(), &convert.input()).unwrap();

    let delivered = Arc::new(AtomicUsize::new(0));
    let formats = Arc::new(Mutex::new(Vec::new()));
    let sink_delivered = Arc::clone(&delivered);
    let sink_formats = Arc::clone(&formats);
    let sink = Port::input(&format!("{name}-sink"), "sink", move |_, buffer| {
        sink_delivered.fetch_add(1, Ordering::SeqCst);
        sink_formats
            .lock()
            .unwrap()
            .push(buffer.format().sample_format().map(str::to_string));
        Ok(())
    });
    Port::link_filtered(&convert.output(), &sink, constraint).unwrap();

    Branch {
        queue,
        convert,
        delivered,
        formats,
    }
}

fn native_buffer() -> AudioBuffer {
    AudioBuffer::new(
        FormatDescriptor::raw_audio()
            .with(ATTR_FORMAT, F32LE)
            .with(ATTR_RATE, 44100)
            .with(ATTR_CHANNELS, 2),
        vec![0.1; 64],
    )
}

fn wait_for(counter: &AtomicUsize, expected: usize) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while counter.load(Ordering::SeqCst) < expected {
        assert!(Instant::now() < deadline, "timed out waiting for buffers");
        std::thread::sleep(Duration::from_millis(1));
    }
}

#[test]
fn two_branch_topology_delivers_and_negotiates_formats() {
    // ingress queue -> convert -> tee -> {monitor, playback}
    let ingress = Queue::with_capacity("ingress", 8).unwrap();
    let ingress_convert = Convert::new("convert");
    let tee = Tee::new("tee");
    Port::link(&ingress.output(), &ingress_convert.input()).unwrap();
    Port::link(&ingress_convert.output(), &tee.input()).unwrap();

    let monitor = build_branch(
        "monitor",
        FormatDescriptor::raw_audio().with(ATTR_FORMAT, S16LE),
    );
    let playback = build_branch("playback", FormatDescriptor::raw_audio());
    Port::link(&tee.request_output_port(), &monitor.queue.input()).unwrap();
    Port::link(&tee.request_output_port(), &playback.queue.input()).unwrap();

    const COUNT: usize = 50;
    for _ in 0..COUNT {
        ingress.input().deliver(native_buffer()).unwrap();
    }
    wait_for(&monitor.delivered, COUNT);
    wait_for(&playback.delivered, COUNT);

    // Monitor branch carries the forced encoding; playback keeps the native
    // one.
    assert!(monitor
        .formats
        .lock()
        .unwrap()
        .iter()
        .all(|f| f.as_deref() == Some(S16LE)));
    assert!(playback
        .formats
        .lock()
        .unwrap()
        .iter()
        .all(|f| f.as_deref() == Some(F32LE)));

    // Negotiated formats are visible on the converter output ports.
    assert_eq!(
        monitor.convert.output().current_format().unwrap().sample_format(),
        Some(S16LE)
    );
    assert_eq!(
        playback.convert.output().current_format().unwrap().sample_format(),
        Some(F32LE)
    );
}

#[test]
fn branch_counters_are_isolated() {
    let tee = Tee::new("tee");
    let monitor_seen = Arc::new(AtomicUsize::new(0));
    let playback_seen = Arc::new(AtomicUsize::new(0));

    let monitor_port = tee.request_output_port();
    let playback_port = tee.request_output_port();
    let m = Arc::clone(&monitor_seen);
    monitor_port.add_probe(Box::new(move |_, _| {
        m.fetch_add(1, Ordering::SeqCst);
        ProbeAction::Pass
    }));
    let p = Arc::clone(&playback_seen);
    playback_port.add_probe(Box::new(move |_, _| {
        p.fetch_add(1, Ordering::SeqCst);
        ProbeAction::Pass
    }));

    let sink_a = Port::input("a", "sink", |_, _| Ok(()));
    Port::link(&monitor_port, &sink_a).unwrap();
    // Playback port left unlinked: driving the monitor branch must not
    // touch the playback counter.
    for _ in 0..1000 {
        tee.input().deliver(native_buffer()).unwrap();
    }

    assert_eq!(monitor_seen.load(Ordering::SeqCst), 1000);
    assert_eq!(playback_seen.load(Ordering::SeqCst), 0);
}

#[test]
fn branch_observer_reports_do_not_disturb_flow() {
    let queue = Queue::with_capacity("q", 8).unwrap();
    install_branch_observer(&queue.output(), "monitor");

    let delivered = Arc::new(AtomicUsize::new(0));
    let sink_delivered = Arc::clone(&delivered);
    let sink = Port::input("sink", "sink", move |_, _| {
        sink_delivered.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    Port::link(&queue.output(), &sink).unwrap();

    for _ in 0..100 {
        queue.input().deliver(native_buffer()).unwrap();
    }
    wait_for(&delivered, 100);
}
