//! Mock adapters for integration tests.
//!
//! Scripted samples and feedback in, recorded events and coil edges out,
//! so tests can assert on the whole control cycle without real ADC or
//! GPIO registers.

use core::cell::Cell;
use core::convert::Infallible;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use embedded_hal::digital::{ErrorType, OutputPin};

use loadcontrol::CHANNEL_COUNT;
use loadcontrol::app::events::ControlEvent;
use loadcontrol::app::ports::{Clock, EventSink, FeedbackPort, ParamStore, SamplePort};
use loadcontrol::config::ProtectionParams;
use loadcontrol::drivers::pulse::PulseGenerator;
use loadcontrol::error::ConfigError;
use loadcontrol::latch::PulsePair;
use loadcontrol::sensors::{ChannelSample, SampleFrame};

// ── Board ─────────────────────────────────────────────────────

/// Nominal bus voltage in the engine's 0.1 V unit.
pub const NOMINAL_V: i32 = 550;

pub struct MockBoard {
    pub frame: SampleFrame,
    pub feedback: [bool; CHANNEL_COUNT],
}

#[allow(dead_code)]
impl MockBoard {
    /// Healthy bus, no load current, every relay open.
    pub fn new() -> Self {
        let sample = ChannelSample {
            voltage: NOMINAL_V,
            current: 0,
        };
        Self {
            frame: SampleFrame {
                channels: [sample; CHANNEL_COUNT],
                system_voltage: NOMINAL_V,
            },
            feedback: [false; CHANNEL_COUNT],
        }
    }

    pub fn set_voltage(&mut self, channel: usize, voltage: i32) {
        self.frame.channels[channel].voltage = voltage;
    }

    pub fn set_current(&mut self, channel: usize, current: i32) {
        self.frame.channels[channel].current = current;
    }
}

impl SamplePort for MockBoard {
    fn read_samples(&mut self) -> SampleFrame {
        self.frame
    }
}

impl FeedbackPort for MockBoard {
    fn read_feedback(&mut self, _now_ms: u64) -> [bool; CHANNEL_COUNT] {
        self.feedback
    }
}

// ── Clock ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct ManualClock(Cell<u64>);

#[allow(dead_code)]
impl ManualClock {
    pub fn advance(&self, ms: u64) {
        self.0.set(self.0.get() + ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.0.get()
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<ControlEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&ControlEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &ControlEvent) {
        self.events.push(*event);
    }
}

// ── Parameter store ───────────────────────────────────────────

#[derive(Default)]
pub struct MockStore {
    pub saved: HashMap<usize, ProtectionParams>,
    pub cleared: u32,
}

#[allow(dead_code)]
impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ParamStore for MockStore {
    fn load(&self, channel: usize) -> Result<ProtectionParams, ConfigError> {
        self.saved.get(&channel).copied().ok_or(ConfigError::NotFound)
    }

    fn save(&mut self, channel: usize, params: &ProtectionParams) -> Result<(), ConfigError> {
        self.saved.insert(channel, *params);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), ConfigError> {
        self.saved.clear();
        self.cleared += 1;
        Ok(())
    }
}

// ── Coil pins ─────────────────────────────────────────────────

/// Tracks how many coils are energised at once across a set of pins.
#[derive(Default)]
pub struct CoilBus {
    energised: AtomicU32,
    peak: AtomicU32,
}

#[allow(dead_code)]
impl CoilBus {
    /// Most coils ever energised together.
    pub fn peak(&self) -> u32 {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Active-high output that counts pulse starts.  `Send`, so it can live
/// on the pulse worker thread.
#[derive(Clone, Default)]
pub struct CoilPin {
    level: Arc<AtomicBool>,
    rises: Arc<AtomicU32>,
    bus: Arc<CoilBus>,
}

#[allow(dead_code)]
impl CoilPin {
    pub fn on_bus(bus: &Arc<CoilBus>) -> Self {
        Self {
            bus: Arc::clone(bus),
            ..Self::default()
        }
    }

    pub fn rises(&self) -> u32 {
        self.rises.load(Ordering::SeqCst)
    }

    pub fn is_high(&self) -> bool {
        self.level.load(Ordering::SeqCst)
    }
}

impl ErrorType for CoilPin {
    type Error = Infallible;
}

impl OutputPin for CoilPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        if self.level.swap(false, Ordering::SeqCst) {
            self.bus.energised.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        if !self.level.swap(true, Ordering::SeqCst) {
            self.rises.fetch_add(1, Ordering::SeqCst);
            let now = self.bus.energised.fetch_add(1, Ordering::SeqCst) + 1;
            self.bus.peak.fetch_max(now, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// One channel's coil pins, kept by the test to observe the outputs.
#[derive(Clone, Default)]
pub struct CoilProbe {
    pub on: CoilPin,
    pub off: CoilPin,
}

#[allow(dead_code)]
impl CoilProbe {
    pub fn on_bus(bus: &Arc<CoilBus>) -> Self {
        Self {
            on: CoilPin::on_bus(bus),
            off: CoilPin::on_bus(bus),
        }
    }

    /// Generator pair wired to this probe: 100 ms on, 100 ms off.
    pub fn pair(&self) -> PulsePair<CoilPin> {
        PulsePair::new(
            PulseGenerator::new(Some(self.on.clone()), 100, 100, false),
            PulseGenerator::new(Some(self.off.clone()), 100, 100, false),
        )
    }
}
