//! Integration tests for the ControlService → ProtectionEngine → latch
//! pipeline with self-contained actuators.
//!
//! Every channel owns its coil generators, so a tick drives the mock pins
//! directly and the tests observe pulse starts on the probes.

use loadcontrol::CHANNEL_COUNT;
use loadcontrol::app::commands::ControlCommand;
use loadcontrol::app::events::ControlEvent;
use loadcontrol::app::service::ControlService;
use loadcontrol::config::{ProtectionParams, SystemConfig};
use loadcontrol::error::{ConfigError, Error};
use loadcontrol::latch::{Direction, LatchActuator, LatchMode, RetryPolicy};
use loadcontrol::status::FaultFlags;

use crate::mock_hw::{CoilPin, CoilProbe, MockBoard, MockStore, NOMINAL_V, RecordingSink};

type Service = ControlService<LatchActuator<CoilPin>>;

fn make_service() -> (Service, [CoilProbe; CHANNEL_COUNT]) {
    let probes: [CoilProbe; CHANNEL_COUNT] = Default::default();
    let latches = core::array::from_fn(|i| {
        LatchActuator::new(i as u8, RetryPolicy::default(), probes[i].pair())
    });
    (ControlService::new(&SystemConfig::default(), latches), probes)
}

// ── Auto mode ─────────────────────────────────────────────────

#[test]
fn healthy_open_relays_get_one_set_pulse() {
    let (mut svc, probes) = make_service();
    let mut board = MockBoard::new();
    let mut sink = RecordingSink::new();

    svc.tick(0, &mut board, &mut sink);
    for p in &probes {
        assert_eq!(p.on.rises(), 1);
        assert_eq!(p.off.rises(), 0);
        assert!(p.on.is_high());
    }

    // Relays report closed: nothing further is pulsed.
    board.feedback = [true; CHANNEL_COUNT];
    for t in [10, 150, 300, 1000] {
        svc.tick(t, &mut board, &mut sink);
    }
    for p in &probes {
        assert_eq!(p.on.rises(), 1);
        assert!(!p.on.is_high(), "pulse window should have ended");
    }
    assert!(sink.events.is_empty());
}

#[test]
fn overvoltage_opens_only_the_affected_relay() {
    let (mut svc, probes) = make_service();
    let mut board = MockBoard::new();
    let mut sink = RecordingSink::new();
    board.feedback = [true; CHANNEL_COUNT];
    svc.tick(0, &mut board, &mut sink);

    board.set_voltage(1, 605);
    svc.tick(5, &mut board, &mut sink);
    assert_eq!(probes[1].off.rises(), 1);
    assert_eq!(probes[0].off.rises(), 0);
    assert_eq!(probes[2].off.rises(), 0);
    assert_eq!(
        sink.events,
        [ControlEvent::FaultRaised {
            channel: 1,
            flags: FaultFlags::from_bits(0b0010)
        }]
    );
    assert!(svc.status().faults[1].overvoltage);

    // Relay opened.  Inside the hysteresis band the fault holds.
    board.feedback[1] = false;
    board.set_voltage(1, 590);
    svc.tick(300, &mut board, &mut sink);
    assert_eq!(probes[1].on.rises(), 0);
    assert!(svc.status().faults[1].overvoltage);

    board.set_voltage(1, 575);
    svc.tick(500, &mut board, &mut sink);
    assert_eq!(probes[1].on.rises(), 1);
    assert_eq!(
        sink.events.last(),
        Some(&ControlEvent::FaultCleared {
            channel: 1,
            flags: FaultFlags::from_bits(0b0010)
        })
    );
}

#[test]
fn sustained_overcurrent_trips_after_detection_time() {
    let (mut svc, probes) = make_service();
    let mut board = MockBoard::new();
    let mut sink = RecordingSink::new();
    board.feedback = [true; CHANNEL_COUNT];

    board.set_current(0, 1200);
    let mut t = 0;
    while t < 2000 {
        svc.tick(t, &mut board, &mut sink);
        t += 5;
    }
    assert!(!svc.status().faults[0].overcurrent);
    assert_eq!(probes[0].off.rises(), 0);

    svc.tick(2000, &mut board, &mut sink);
    assert!(svc.status().faults[0].overcurrent);
    assert_eq!(probes[0].off.rises(), 1);
}

#[test]
fn unconfirmed_relay_escalates_and_recovers() {
    let (mut svc, _probes) = make_service();
    let mut board = MockBoard::new();
    let mut sink = RecordingSink::new();

    for t in (0..=5000).step_by(1000) {
        svc.tick(t, &mut board, &mut sink);
    }
    let failed = |e: &ControlEvent| {
        matches!(e, ControlEvent::ActuationFailed { direction: Direction::On, .. })
    };
    assert_eq!(sink.count(failed), CHANNEL_COUNT);
    let status = svc.status();
    assert!(status.feedback.channels.iter().all(|c| c.on_failed));
    assert!(status.feedback.channels.iter().all(|c| !c.off_failed));

    board.feedback = [true; CHANNEL_COUNT];
    svc.tick(6000, &mut board, &mut sink);
    let recovered = |e: &ControlEvent| {
        matches!(e, ControlEvent::ActuationRecovered { direction: Direction::On, .. })
    };
    assert_eq!(sink.count(recovered), CHANNEL_COUNT);
    assert!(svc.status().feedback.channels.iter().all(|c| !c.on_failed));
}

// ── Operator commands ─────────────────────────────────────────

#[test]
fn manual_mode_pulses_only_on_request() {
    let (mut svc, probes) = make_service();
    let mut board = MockBoard::new();
    let mut sink = RecordingSink::new();
    let mut store = MockStore::new();

    svc.handle_command(ControlCommand::SetManual, &mut store, &mut sink)
        .unwrap();
    assert_eq!(svc.mode(), LatchMode::Manual);
    assert_eq!(
        sink.events,
        [ControlEvent::ModeChanged {
            from: LatchMode::Auto,
            to: LatchMode::Manual
        }]
    );

    svc.tick(0, &mut board, &mut sink);
    assert!(probes.iter().all(|p| p.on.rises() == 0));

    svc.handle_command(ControlCommand::PulseOff(2), &mut store, &mut sink)
        .unwrap();
    svc.tick(5, &mut board, &mut sink);
    assert_eq!(probes[2].off.rises(), 1);
    assert_eq!(probes[0].off.rises(), 0);

    assert_eq!(
        svc.handle_command(ControlCommand::PulseOn(5), &mut store, &mut sink),
        Err(Error::Config(ConfigError::UnknownChannel(5)))
    );

    let status = svc.status();
    assert!(status.system.run);
    assert!(status.system.manual);
    assert_eq!(status.input_registers()[11], 0b11);
}

#[test]
fn stop_halts_actuation() {
    let (mut svc, probes) = make_service();
    let mut board = MockBoard::new();
    let mut sink = RecordingSink::new();
    let mut store = MockStore::new();

    svc.handle_command(ControlCommand::Stop, &mut store, &mut sink)
        .unwrap();
    for t in (0..3000).step_by(5) {
        svc.tick(t, &mut board, &mut sink);
    }
    assert!(probes.iter().all(|p| p.on.rises() == 0 && p.off.rises() == 0));
    assert!(!svc.status().system.run);

    // Back to auto: the mismatch is corrected right away.
    svc.handle_command(ControlCommand::SetAuto, &mut store, &mut sink)
        .unwrap();
    svc.tick(3000, &mut board, &mut sink);
    assert!(probes.iter().all(|p| p.on.rises() == 1));
}

#[test]
fn update_params_validates_then_persists() {
    let (mut svc, _probes) = make_service();
    let mut sink = RecordingSink::new();
    let mut store = MockStore::new();

    let bad = ProtectionParams {
        overvoltage_reconnect: 620,
        ..ProtectionParams::default()
    };
    assert_eq!(
        svc.handle_command(
            ControlCommand::UpdateParams {
                channel: 0,
                params: bad
            },
            &mut store,
            &mut sink
        ),
        Err(Error::Config(ConfigError::OvervoltageBand))
    );
    assert!(store.saved.is_empty());
    assert!(sink.events.is_empty());

    let good = ProtectionParams {
        overcurrent_disconnect: 1500,
        ..ProtectionParams::default()
    };
    svc.handle_command(
        ControlCommand::UpdateParams {
            channel: 2,
            params: good,
        },
        &mut store,
        &mut sink,
    )
    .unwrap();
    assert_eq!(store.saved.get(&2), Some(&good));
    assert_eq!(svc.channel(2).unwrap().engine.params(), &good);
    assert_eq!(sink.events, [ControlEvent::ParamsUpdated { channel: 2 }]);
}

#[test]
fn factory_reset_restores_defaults_everywhere() {
    let (mut svc, _probes) = make_service();
    let mut sink = RecordingSink::new();
    let mut store = MockStore::new();

    let custom = ProtectionParams {
        short_circuit_disconnect: 3000,
        ..ProtectionParams::default()
    };
    svc.apply_params(1, custom).unwrap();

    svc.handle_command(ControlCommand::FactoryReset, &mut store, &mut sink)
        .unwrap();
    assert_eq!(store.cleared, 1);
    assert_eq!(store.saved.len(), CHANNEL_COUNT);
    for ch in 0..CHANNEL_COUNT {
        assert_eq!(svc.channel(ch).unwrap().engine.params(), &ProtectionParams::default());
    }
}

#[test]
fn stored_params_are_loaded_when_valid() {
    let (mut svc, _probes) = make_service();
    let mut store = MockStore::new();
    let custom = ProtectionParams {
        undervoltage_disconnect: 450,
        undervoltage_reconnect: 470,
        ..ProtectionParams::default()
    };
    let invalid = ProtectionParams {
        short_circuit_disconnect: 500,
        ..ProtectionParams::default()
    };
    store.saved.insert(0, custom);
    store.saved.insert(1, invalid);

    svc.load_params(&store);
    assert_eq!(svc.channel(0).unwrap().engine.params(), &custom);
    assert_eq!(svc.channel(1).unwrap().engine.params(), &ProtectionParams::default());
    assert_eq!(svc.channel(2).unwrap().engine.params(), &ProtectionParams::default());
}

// ── Status ────────────────────────────────────────────────────

#[test]
fn status_reflects_last_cycle() {
    let (mut svc, _probes) = make_service();
    let mut board = MockBoard::new();
    let mut sink = RecordingSink::new();
    board.set_current(0, -120);
    board.feedback = [false, true, false];

    svc.tick(0, &mut board, &mut sink);
    let regs = svc.status().input_registers();
    assert_eq!(&regs[..3], &[NOMINAL_V as u16; 3]);
    assert_eq!(regs[3], NOMINAL_V as u16);
    assert_eq!(regs[4] as i16, -120);
    assert_eq!(&regs[7..10], &[0, 0, 0]);
    // MCB present on every channel, relay 2 closed.
    assert_eq!(regs[10], 0b000_0001_0111);
    assert_eq!(regs[11], 0b01);
}
