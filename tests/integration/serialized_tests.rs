//! Integration tests for the serialized actuation path:
//! ControlService → SignalLatch → PulseQueue → PulseWorker → completions.

use std::sync::Arc;
use std::time::{Duration, Instant};

use loadcontrol::CHANNEL_COUNT;
use loadcontrol::adapters::time::MonotonicClock;
use loadcontrol::app::commands::ControlCommand;
use loadcontrol::app::events::ControlEvent;
use loadcontrol::app::service::ControlService;
use loadcontrol::config::SystemConfig;
use loadcontrol::drivers::task_pin::{Core, spawn_on_core};
use loadcontrol::latch::queue::COMMAND_DEPTH;
use loadcontrol::latch::{
    Direction, Latch, PulseCommand, PulseQueue, PulseWorker, QueueSink, RetryPolicy, SignalLatch,
};

use crate::mock_hw::{CoilBus, CoilProbe, ManualClock, MockBoard, MockStore, RecordingSink};

type Service = ControlService<SignalLatch<QueueSink<'static>>>;

fn leak_queue() -> &'static PulseQueue {
    Box::leak(Box::new(PulseQueue::new()))
}

fn make_service(queue: &'static PulseQueue, timeout_ms: u32) -> Service {
    let latches = core::array::from_fn(|i| {
        SignalLatch::new(i as u8, RetryPolicy::default(), QueueSink::new(queue, timeout_ms))
    });
    ControlService::new(&SystemConfig::default(), latches)
}

fn spawn_worker(queue: &'static PulseQueue, probes: &[CoilProbe; CHANNEL_COUNT]) {
    let worker = PulseWorker::new(probes.clone().map(|p| p.pair()), 1);
    spawn_on_core(Core::App, 5, 64, "pulse-worker-test\0", move || {
        worker.run(queue, MonotonicClock::new());
    })
    .unwrap();
}

/// Apply completions until `expected` have arrived or the deadline passes.
fn await_completions(svc: &mut Service, queue: &PulseQueue, expected: usize) -> usize {
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut seen = 0;
    while seen < expected && Instant::now() < deadline {
        seen += svc.drain_completions(queue);
        std::thread::sleep(Duration::from_millis(5));
    }
    seen
}

// ── Worker round trip ─────────────────────────────────────────

#[test]
fn worker_pulses_each_channel_once_and_never_overlaps() {
    let queue = leak_queue();
    let bus = Arc::new(CoilBus::default());
    let probes: [CoilProbe; CHANNEL_COUNT] = core::array::from_fn(|_| CoilProbe::on_bus(&bus));
    spawn_worker(queue, &probes);

    let mut svc = make_service(queue, 10);
    let mut board = MockBoard::new();
    let mut sink = RecordingSink::new();

    // Every relay is open while the engine wants it closed.
    svc.tick(0, &mut board, &mut sink);
    for ch in 0..CHANNEL_COUNT {
        assert!(svc.channel(ch).unwrap().latch.is_in_flight(Direction::On));
    }

    // While in flight, further cycles must not queue duplicates.
    for t in [5, 10, 15] {
        svc.tick(t, &mut board, &mut sink);
    }

    assert_eq!(await_completions(&mut svc, queue, CHANNEL_COUNT), CHANNEL_COUNT);
    for p in &probes {
        assert_eq!(p.on.rises(), 1);
        assert_eq!(p.off.rises(), 0);
    }
    assert_eq!(bus.peak(), 1, "coils must be pulsed one at a time");
    for ch in 0..CHANNEL_COUNT {
        let latch = &svc.channel(ch).unwrap().latch;
        assert!(!latch.is_in_flight(Direction::On));
        assert_eq!(latch.fail_count(Direction::On), 1);
    }
    assert!(sink.events.is_empty());
}

// ── Queue full ────────────────────────────────────────────────

#[test]
fn full_queue_drops_request_and_releases_guard() {
    let queue = leak_queue();
    for _ in 0..COMMAND_DEPTH {
        queue.commands.try_send(PulseCommand::Off(0)).unwrap();
    }
    let mut svc = make_service(queue, 0);
    let mut board = MockBoard::new();
    let mut sink = RecordingSink::new();

    svc.tick(0, &mut board, &mut sink);
    let dropped = |e: &ControlEvent| {
        matches!(e, ControlEvent::PulseDropped { direction: Direction::On, .. })
    };
    assert_eq!(sink.count(dropped), CHANNEL_COUNT);
    for ch in 0..CHANNEL_COUNT {
        let latch = &svc.channel(ch).unwrap().latch;
        assert!(!latch.is_in_flight(Direction::On));
        assert_eq!(latch.fail_count(Direction::On), 0, "a dropped pulse is not a retry");
    }

    // One slot frees up: the next cycle gets through for channel 0 only.
    assert!(queue.commands.try_receive().is_ok());
    svc.tick(5, &mut board, &mut sink);
    assert!(svc.channel(0).unwrap().latch.is_in_flight(Direction::On));
    assert!(!svc.channel(1).unwrap().latch.is_in_flight(Direction::On));
    assert_eq!(sink.count(dropped), 2 * CHANNEL_COUNT - 1);
}

// ── Completions ───────────────────────────────────────────────

#[test]
fn completion_for_unknown_channel_is_ignored() {
    let queue = leak_queue();
    let mut svc = make_service(queue, 0);
    queue.completions.try_send(PulseCommand::On(9)).unwrap();
    assert_eq!(svc.drain_completions(queue), 1);
    assert_eq!(svc.drain_completions(queue), 0);
}

#[test]
fn manual_pulse_is_queued_for_the_worker() {
    let queue = leak_queue();
    let mut svc = make_service(queue, 0);
    let mut board = MockBoard::new();
    let mut sink = RecordingSink::new();
    let mut store = MockStore::new();

    svc.handle_command(ControlCommand::SetManual, &mut store, &mut sink)
        .unwrap();
    svc.handle_command(ControlCommand::PulseOff(1), &mut store, &mut sink)
        .unwrap();
    svc.tick(0, &mut board, &mut sink);

    assert_eq!(queue.commands.try_receive().ok(), Some(PulseCommand::Off(1)));
    assert!(queue.commands.try_receive().is_err());

    // Completion closes the loop.
    queue.completions.try_send(PulseCommand::Off(1)).unwrap();
    svc.drain_completions(queue);
    assert!(!svc.channel(1).unwrap().latch.is_in_flight(Direction::Off));
}

#[test]
fn stop_withdraws_pulses_the_worker_has_not_started() {
    let queue = leak_queue();
    let probes: [CoilProbe; CHANNEL_COUNT] = core::array::from_fn(|_| CoilProbe::default());
    let mut worker = PulseWorker::new(probes.clone().map(|p| p.pair()), 1);
    let mut svc = make_service(queue, 0);
    let mut board = MockBoard::new();
    let mut sink = RecordingSink::new();
    let mut store = MockStore::new();

    svc.tick(0, &mut board, &mut sink);
    svc.channel_mut(2).unwrap().latch.stop();
    assert!(!svc.channel(2).unwrap().latch.is_in_flight(Direction::On));

    let clock = MonotonicClock::new();
    worker.serve_one(queue, &clock);
    worker.serve_one(queue, &clock);
    assert!(queue.commands.try_receive().is_err());
    assert_eq!(probes[0].on.rises(), 1);
    assert_eq!(probes[1].on.rises(), 1);
    assert_eq!(probes[2].on.rises(), 0, "stopped channel must not be pulsed");

    // Same for the whole board, and for a switch to manual.
    svc.drain_completions(queue);
    svc.handle_command(ControlCommand::Stop, &mut store, &mut sink)
        .unwrap();
    svc.handle_command(ControlCommand::SetAuto, &mut store, &mut sink)
        .unwrap();
    svc.tick(5, &mut board, &mut sink);
    svc.handle_command(ControlCommand::SetManual, &mut store, &mut sink)
        .unwrap();
    assert!(queue.commands.try_receive().is_err());
    for ch in 0..CHANNEL_COUNT {
        assert!(!svc.channel(ch).unwrap().latch.is_in_flight(Direction::On));
    }
}

// ── Worker in isolation ───────────────────────────────────────

#[test]
fn worker_holds_the_coil_for_the_whole_window() {
    let probe = CoilProbe::default();
    let mut worker = PulseWorker::new([probe.pair()], 1);
    let clock = ManualClock::default();

    let mut high_ticks = 0;
    worker
        .execute(PulseCommand::On(0), &clock, || {
            if probe.on.is_high() {
                high_ticks += 1;
            }
            clock.advance(10);
        })
        .unwrap();
    assert_eq!(probe.on.rises(), 1);
    assert_eq!(high_ticks, 10);
    assert!(!probe.on.is_high());
}
