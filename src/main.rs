//! LoadControl firmware entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  BoardAdapter        LogEventSink   MemoryParamStore           │
//! │  (Sample+Feedback)   (EventSink)    (ParamStore)               │
//! │  MonotonicClock      CoilBank (manual override surface)        │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌───────────────────────────┐  PulseQueue ┌───────────────┐   │
//! │  │ ControlService (core 0)   │────────────▶│ PulseWorker   │   │
//! │  │ ProtectionEngine ×3       │◀────────────│ (core 1)      │   │
//! │  │ SignalLatch ×3            │ completions │ coil outputs  │   │
//! │  └───────────────────────────┘             └───────────────┘   │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use core::cell::RefCell;
use std::time::Duration;

use anyhow::Result;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use log::{debug, info, warn};

use loadcontrol::CHANNEL_COUNT;
use loadcontrol::adapters::hardware::BoardAdapter;
use loadcontrol::adapters::log_sink::LogEventSink;
use loadcontrol::adapters::params::MemoryParamStore;
use loadcontrol::adapters::time::MonotonicClock;
use loadcontrol::app::ports::Clock;
use loadcontrol::app::service::ControlService;
use loadcontrol::coils::CoilBank;
use loadcontrol::config::SystemConfig;
use loadcontrol::drivers::gpio::{GpioInput, GpioOutput};
use loadcontrol::drivers::hw_init;
use loadcontrol::drivers::pulse::PulseGenerator;
use loadcontrol::drivers::task_pin::{Core, spawn_on_core};
use loadcontrol::error::Error;
use loadcontrol::latch::{PulsePair, PulseQueue, PulseWorker, QueueSink, RetryPolicy, SignalLatch};
use loadcontrol::pins;
use loadcontrol::status::INPUT_REGISTER_COUNT;

// ── Shared state ──────────────────────────────────────────────

/// Pulse requests (control loop → worker) and completions (worker → loop).
static PULSE_QUEUE: PulseQueue = PulseQueue::new();

/// Written by the protocol layer, drained by the control loop.
pub static COILS: CoilBank = CoilBank::new();

/// Input-register block published once per control cycle.
pub static INPUT_REGISTERS: Mutex<CriticalSectionRawMutex, RefCell<[u16; INPUT_REGISTER_COUNT]>> =
    Mutex::new(RefCell::new([0; INPUT_REGISTER_COUNT]));

const WORKER_PRIORITY: u8 = 10;
const WORKER_STACK_KB: usize = 4;

fn coil_pairs(config: &SystemConfig) -> [PulsePair<GpioOutput>; CHANNEL_COUNT] {
    core::array::from_fn(|ch| {
        let generator = |gpio| {
            PulseGenerator::new(
                Some(GpioOutput::new(gpio)),
                config.pulse_on_ms,
                config.pulse_off_ms,
                config.pulse_active_low,
            )
        };
        PulsePair::new(generator(pins::RELAY_ON_GPIO[ch]), generator(pins::RELAY_OFF_GPIO[ch]))
    })
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  LoadControl v{}                     ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Peripherals ────────────────────────────────────────
    hw_init::init_peripherals().map_err(Error::from)?;

    let config = SystemConfig::default();
    let clock = MonotonicClock::new();

    // ── 3. Pulse worker (core 1) ──────────────────────────────
    let worker = PulseWorker::new(coil_pairs(&config), config.worker_poll_ms);
    spawn_on_core(
        Core::App,
        WORKER_PRIORITY,
        WORKER_STACK_KB,
        "pulse-worker\0",
        move || {
            worker.run(&PULSE_QUEUE, clock);
        },
    )?;

    // ── 4. Control service ────────────────────────────────────
    let policy = RetryPolicy::from(&config);
    let latches = core::array::from_fn(|ch| {
        SignalLatch::new(
            ch as u8,
            policy,
            QueueSink::new(&PULSE_QUEUE, config.queue_send_timeout_ms),
        )
    });
    let mut service = ControlService::new(&config, latches);

    let mut store = MemoryParamStore::new();
    service.load_params(&store);

    let mut board = BoardAdapter::new(&config, pins::RELAY_FEEDBACK_GPIO.map(GpioInput::new));
    let mut sink = LogEventSink::new();

    info!("System ready. Entering control loop.");

    // ── 5. Control loop ───────────────────────────────────────
    let interval = Duration::from_millis(u64::from(config.control_loop_interval_ms));
    loop {
        let now_ms = clock.now_ms();

        for cmd in COILS.take_commands() {
            if let Err(e) = service.handle_command(cmd, &mut store, &mut sink) {
                warn!("coil command {:?} rejected: {}", cmd, e);
            }
        }

        service.tick(now_ms, &mut board, &mut sink);
        let acked = service.drain_completions(&PULSE_QUEUE);
        if acked > 0 {
            debug!("{} pulse completion(s) applied", acked);
        }

        let registers = service.status().input_registers();
        INPUT_REGISTERS.lock(|r| *r.borrow_mut() = registers);

        std::thread::sleep(interval);
    }
}
