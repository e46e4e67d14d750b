//! Non-blocking single-pulse output for latching relay coils.
//!
//! A pulse is an active phase of `on_ms` followed by an idle guard phase of
//! `off_ms`.  The generator counts as running for the whole on+off window so
//! callers never queue a second pulse into the guard gap.  `set()` while
//! running is ignored, so a re-trigger can never stretch or restart a pulse.
//!
//! Durations and polarity are latched when the pulse starts; setters only
//! affect the next pulse.

use embedded_hal::digital::OutputPin;
use log::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PulseShape {
    on_ms: u32,
    off_ms: u32,
    active_low: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PulseState {
    Idle,
    On { started_at: u64, shape: PulseShape },
    Off { started_at: u64, shape: PulseShape },
}

pub struct PulseGenerator<P> {
    /// `None` runs the timing without touching hardware.
    pin: Option<P>,
    shape: PulseShape,
    state: PulseState,
}

impl<P: OutputPin> PulseGenerator<P> {
    /// Construct and drive the pin to its idle level.
    pub fn new(pin: Option<P>, on_ms: u32, off_ms: u32, active_low: bool) -> Self {
        let mut pg = Self {
            pin,
            shape: PulseShape {
                on_ms,
                off_ms,
                active_low,
            },
            state: PulseState::Idle,
        };
        pg.reset();
        pg
    }

    /// Start a pulse.  Returns `false` (and changes nothing) if one is
    /// already running.
    pub fn set(&mut self, now_ms: u64) -> bool {
        if self.is_running() {
            return false;
        }
        let shape = self.shape;
        self.state = PulseState::On {
            started_at: now_ms,
            shape,
        };
        self.drive(!shape.active_low);
        true
    }

    /// Abort any pulse and drive the idle level immediately.
    pub fn reset(&mut self) {
        self.state = PulseState::Idle;
        let idle = self.shape.active_low;
        self.drive(idle);
    }

    /// Advance the pulse.  Call every control cycle.
    pub fn tick(&mut self, now_ms: u64) {
        match self.state {
            PulseState::Idle => {}
            PulseState::On { started_at, shape } => {
                let elapsed = now_ms.saturating_sub(started_at);
                if elapsed < u64::from(shape.on_ms) {
                    self.drive(!shape.active_low);
                    return;
                }
                self.drive(shape.active_low);
                self.state = PulseState::Off { started_at, shape };
                self.finish_if_elapsed(now_ms);
            }
            PulseState::Off { .. } => self.finish_if_elapsed(now_ms),
        }
    }

    /// True from `set()` until the guard phase has elapsed.
    pub fn is_running(&self) -> bool {
        !matches!(self.state, PulseState::Idle)
    }

    /// True only while the coil is energised.
    pub fn is_active(&self) -> bool {
        matches!(self.state, PulseState::On { .. })
    }

    pub fn set_on_duration(&mut self, on_ms: u32) {
        self.shape.on_ms = on_ms;
    }

    pub fn set_off_duration(&mut self, off_ms: u32) {
        self.shape.off_ms = off_ms;
    }

    pub fn set_active_low(&mut self, active_low: bool) {
        self.shape.active_low = active_low;
    }

    pub fn on_duration(&self) -> u32 {
        self.shape.on_ms
    }

    pub fn off_duration(&self) -> u32 {
        self.shape.off_ms
    }

    pub fn pin(&self) -> Option<&P> {
        self.pin.as_ref()
    }

    fn finish_if_elapsed(&mut self, now_ms: u64) {
        if let PulseState::Off { started_at, shape } = self.state {
            let total = u64::from(shape.on_ms) + u64::from(shape.off_ms);
            if now_ms.saturating_sub(started_at) >= total {
                self.state = PulseState::Idle;
            }
        }
    }

    fn drive(&mut self, high: bool) {
        let Some(pin) = self.pin.as_mut() else {
            return;
        };
        let res = if high { pin.set_high() } else { pin.set_low() };
        if let Err(e) = res {
            warn!("pulse output write failed: {:?}", e);
        }
    }
}
