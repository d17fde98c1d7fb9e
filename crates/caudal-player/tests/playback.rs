//! End-to-end playback runs over the mock backend.

use std::path::Path;
use std::time::{Duration, Instant};

use caudal_graph::{BusMessage, Error, State};
use caudal_io::MockBackend;
use caudal_player::{build_player, LinkState, PlayerConfig, Termination};

fn write_wav(path: &Path, frames: u32, float: bool) {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 44100,
        bits_per_sample: if float { 32 } else { 16 },
        sample_format: if float {
            hound::SampleFormat::Float
        } else {
            hound::SampleFormat::Int
        },
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..frames {
        let value = f32::from(((i % 100) as i16) - 50) / 64.0;
        if float {
            writer.write_sample(value).unwrap();
            writer.write_sample(-value).unwrap();
        } else {
            let q = (value * 1000.0) as i16;
            writer.write_sample(q).unwrap();
            writer.write_sample(-q).unwrap();
        }
    }
    writer.finalize().unwrap();
}

fn small_config() -> PlayerConfig {
    PlayerConfig {
        buffer_frames: 441, // 10ms blocks keep the synced monitor sink quick
        ..PlayerConfig::default()
    }
}

#[test]
fn plays_a_file_to_end_of_stream() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.wav");
    write_wav(&path, 4410, false);

    let backend = MockBackend::new();
    let pulled = backend.samples_pulled();
    let (controller, linker) =
        build_player(&path, &small_config(), Box::new(backend)).unwrap();

    controller.start().unwrap();
    assert_eq!(controller.pipeline().state(), State::Playing);
    assert_eq!(controller.run_event_loop(), Termination::EndOfStream);

    assert_eq!(linker.state(), LinkState::Linked);
    let format = linker.negotiated_format().unwrap();
    assert_eq!(format.sample_format(), Some("S16LE"));
    assert_eq!(format.rate(), Some(44100));
    assert_eq!(format.channels(), Some(2));
    assert!(pulled.load(std::sync::atomic::Ordering::SeqCst) > 0);

    controller.shutdown();
}

#[test]
fn eos_arrives_only_after_the_monitored_stream_drains() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.wav");
    // Half a second of audio: fifty 10ms blocks through the synced monitor.
    write_wav(&path, 22050, false);

    let (controller, _linker) =
        build_player(&path, &small_config(), Box::new(MockBackend::new())).unwrap();
    controller.start().unwrap();

    let start = Instant::now();
    assert_eq!(controller.run_event_loop(), Termination::EndOfStream);
    // End-of-stream follows the data in-band, so the bus cannot hear it
    // until the monitor branch has paced through the whole file.
    assert!(
        start.elapsed() >= Duration::from_millis(400),
        "end of stream reported after {:?}, before playout",
        start.elapsed()
    );
    controller.shutdown();
}

#[test]
fn float_file_links_with_native_encoding() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone32.wav");
    write_wav(&path, 2205, true);

    let (controller, linker) =
        build_player(&path, &small_config(), Box::new(MockBackend::new())).unwrap();
    controller.start().unwrap();
    assert_eq!(controller.run_event_loop(), Termination::EndOfStream);
    assert_eq!(
        linker.negotiated_format().unwrap().sample_format(),
        Some("F32LE")
    );
    controller.shutdown();
}

#[test]
fn unavailable_device_fails_start_before_the_event_loop() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.wav");
    write_wav(&path, 441, false);

    let (controller, linker) =
        build_player(&path, &small_config(), Box::new(MockBackend::failing())).unwrap();

    let err = controller.start().unwrap_err();
    assert!(matches!(
        err,
        Error::StateTransition { target: State::Ready, .. }
    ));
    // The walk aborted on the first hop: nothing is running, nothing linked.
    assert_eq!(controller.pipeline().state(), State::Null);
    assert_eq!(linker.state(), LinkState::Unlinked);
    controller.shutdown();
}

#[test]
fn streaming_error_terminates_the_event_loop() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.wav");
    write_wav(&path, 44100, false);

    let (controller, _linker) =
        build_player(&path, &small_config(), Box::new(MockBackend::new())).unwrap();
    controller.start().unwrap();

    // An asynchronous device failure arrives on the bus mid-stream.
    controller
        .interrupt_sender()
        .post_error("device-sink", "device disappeared", Some("ENODEV".to_string()));
    assert_eq!(controller.run_event_loop(), Termination::Error);
    controller.shutdown();
}

#[test]
fn interrupt_posts_eos_for_an_orderly_stop() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tone.wav");
    write_wav(&path, 44100, false);

    let (controller, _linker) =
        build_player(&path, &small_config(), Box::new(MockBackend::new())).unwrap();
    controller.start().unwrap();

    let interrupt = controller.interrupt_sender();
    std::thread::spawn(move || interrupt.post(BusMessage::Eos));
    assert_eq!(controller.run_event_loop(), Termination::EndOfStream);
    controller.shutdown();
}

#[test]
fn missing_file_surfaces_as_a_bus_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.wav");

    let (controller, linker) =
        build_player(&path, &small_config(), Box::new(MockBackend::new())).unwrap();
    controller.start().unwrap();
    assert_eq!(controller.run_event_loop(), Termination::Error);
    assert_eq!(linker.state(), LinkState::Unlinked);
    controller.shutdown();
}
