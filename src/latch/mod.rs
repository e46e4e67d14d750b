//! Latching relay actuation.
//!
//! A latching relay has two coils: a SET pulse closes it and a RESET pulse
//! opens it, and it stays put in between.  The actuator compares the
//! protection engine's action with the debounced position feedback every
//! cycle and pulses the coil that corrects a mismatch.
//!
//! ## Retry and fail state
//!
//! Each direction counts the pulses it has issued without the feedback
//! agreeing.  Once the count exceeds `max_retry` the direction enters fail
//! state: it keeps retrying, but at most once per `retry_interval_ms`.
//! Agreement clears the counter and the fail flag on the next call.
//!
//! ## Variants
//!
//! | Type             | Pulse execution                                      |
//! |------------------|------------------------------------------------------|
//! | `LatchActuator`  | owns and ticks its two `PulseGenerator`s inline      |
//! | `SignalLatch`    | sends `PulseCommand`s to the single pulse worker     |
//!
//! Both embed a [`LatchCore`] and share the decision logic through
//! [`LatchCore::step`].

pub mod actuator;
pub mod queue;
pub mod signal;
pub mod worker;

use embedded_hal::digital::OutputPin;
use log::{debug, info, warn};

use crate::config::SystemConfig;
use crate::drivers::pulse::PulseGenerator;

pub use actuator::LatchActuator;
pub use queue::{PulseCommand, PulseQueue, QueueSink};
pub use signal::{PulseSink, SignalLatch};
pub use worker::PulseWorker;

// ---------------------------------------------------------------------------
// Mode and direction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatchMode {
    /// Follow the protection engine.
    Auto,
    /// Operator drives the coils through `set()` / `reset()`.
    Manual,
    /// No actuation at all.
    Stopped,
}

/// Which coil a pulse goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// SET coil: close the relay.
    On,
    /// RESET coil: open the relay.
    Off,
}

impl Direction {
    const fn index(self) -> usize {
        match self {
            Self::On => 0,
            Self::Off => 1,
        }
    }
}

impl core::fmt::Display for Direction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::On => write!(f, "ON"),
            Self::Off => write!(f, "OFF"),
        }
    }
}

/// Retry policy shared by every channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retry_interval_ms: u32,
    pub max_retry: u8,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_interval_ms: 2000,
            max_retry: 5,
        }
    }
}

impl From<&SystemConfig> for RetryPolicy {
    fn from(c: &SystemConfig) -> Self {
        Self {
            retry_interval_ms: c.retry_interval_ms,
            max_retry: c.max_retry,
        }
    }
}

// ---------------------------------------------------------------------------
// Fail tracking
// ---------------------------------------------------------------------------

/// Per-direction retry bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailTracker {
    count: u32,
    failed: bool,
    last_check_ms: u64,
}

impl FailTracker {
    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    fn retry_due(&self, now_ms: u64, interval_ms: u32) -> bool {
        now_ms.saturating_sub(self.last_check_ms) > u64::from(interval_ms)
    }

    fn clear(&mut self) {
        *self = Self::default();
    }
}

// ---------------------------------------------------------------------------
// Pulse execution seam
// ---------------------------------------------------------------------------

/// What the shared decision logic needs from a variant.
pub(crate) trait PulseDriver {
    /// A pulse in this direction is still outstanding.
    fn busy(&self, direction: Direction) -> bool;
    /// Start a pulse.  `false` means nothing was dispatched.
    fn fire(&mut self, direction: Direction, now_ms: u64) -> bool;
}

/// One channel's SET/RESET generator pair.
pub struct PulsePair<P> {
    pub on: PulseGenerator<P>,
    pub off: PulseGenerator<P>,
}

impl<P: OutputPin> PulsePair<P> {
    pub fn new(on: PulseGenerator<P>, off: PulseGenerator<P>) -> Self {
        Self { on, off }
    }

    pub fn get_mut(&mut self, direction: Direction) -> &mut PulseGenerator<P> {
        match direction {
            Direction::On => &mut self.on,
            Direction::Off => &mut self.off,
        }
    }

    pub fn get(&self, direction: Direction) -> &PulseGenerator<P> {
        match direction {
            Direction::On => &self.on,
            Direction::Off => &self.off,
        }
    }

    pub fn tick(&mut self, now_ms: u64) {
        self.on.tick(now_ms);
        self.off.tick(now_ms);
    }

    /// Drive both coils to their idle level.
    pub fn release(&mut self) {
        self.on.reset();
        self.off.reset();
    }
}

impl<P: OutputPin> PulseDriver for PulsePair<P> {
    fn busy(&self, direction: Direction) -> bool {
        self.get(direction).is_running()
    }

    fn fire(&mut self, direction: Direction, now_ms: u64) -> bool {
        self.get_mut(direction).set(now_ms)
    }
}

// ---------------------------------------------------------------------------
// Shared state machine
// ---------------------------------------------------------------------------

pub struct LatchCore {
    channel: u8,
    mode: LatchMode,
    policy: RetryPolicy,
    trackers: [FailTracker; 2],
    /// Operator requests waiting for the next `handle()` in manual mode.
    requested: [bool; 2],
}

impl LatchCore {
    pub fn new(channel: u8, policy: RetryPolicy) -> Self {
        Self {
            channel,
            mode: LatchMode::Auto,
            policy,
            trackers: [FailTracker::default(); 2],
            requested: [false; 2],
        }
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn mode(&self) -> LatchMode {
        self.mode
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: RetryPolicy) {
        self.policy = policy;
    }

    pub fn tracker(&self, direction: Direction) -> &FailTracker {
        &self.trackers[direction.index()]
    }

    /// Switch mode.  Returns the previous mode if anything changed.
    ///
    /// Entering Manual or Auto clears both fail trackers.  Every change
    /// drops queued operator requests.
    pub fn enter(&mut self, mode: LatchMode) -> Option<LatchMode> {
        if self.mode == mode {
            return None;
        }
        let prev = self.mode;
        self.mode = mode;
        self.requested = [false; 2];
        if mode != LatchMode::Stopped {
            self.trackers = [FailTracker::default(); 2];
        }
        info!("latch {}: {:?} -> {:?}", self.channel + 1, prev, mode);
        Some(prev)
    }

    /// Queue an operator pulse.  Ignored outside manual mode.
    pub fn request(&mut self, direction: Direction) {
        if self.mode == LatchMode::Manual {
            self.requested[direction.index()] = true;
        } else {
            debug!(
                "latch {}: {} request ignored in {:?}",
                self.channel + 1,
                direction,
                self.mode
            );
        }
    }

    /// One control cycle of decision logic.  The caller has already
    /// advanced any in-flight pulse.
    pub(crate) fn step<D: PulseDriver>(
        &mut self,
        now_ms: u64,
        action: bool,
        feedback: bool,
        driver: &mut D,
    ) {
        match self.mode {
            LatchMode::Stopped => {}
            LatchMode::Manual => {
                for direction in [Direction::On, Direction::Off] {
                    let slot = &mut self.requested[direction.index()];
                    if *slot && !driver.busy(direction) {
                        *slot = false;
                        driver.fire(direction, now_ms);
                    }
                }
            }
            LatchMode::Auto => {
                if action {
                    if feedback {
                        self.agree(Direction::On);
                    } else {
                        self.correct(Direction::On, now_ms, driver);
                    }
                } else if feedback {
                    self.correct(Direction::Off, now_ms, driver);
                } else {
                    self.agree(Direction::Off);
                }
            }
        }
    }

    fn correct<D: PulseDriver>(&mut self, direction: Direction, now_ms: u64, driver: &mut D) {
        let policy = self.policy;
        let tracker = &mut self.trackers[direction.index()];

        if tracker.failed {
            if tracker.retry_due(now_ms, policy.retry_interval_ms)
                && !driver.busy(direction)
                && driver.fire(direction, now_ms)
            {
                tracker.last_check_ms = now_ms;
                debug!("latch {}: {} fail-state retry", self.channel + 1, direction);
            }
            return;
        }

        if driver.busy(direction) || !driver.fire(direction, now_ms) {
            return;
        }
        tracker.count = tracker.count.saturating_add(1);
        if tracker.count > u32::from(policy.max_retry) {
            tracker.failed = true;
            tracker.last_check_ms = now_ms;
            warn!(
                "latch {}: {} not confirmed after {} pulses, retrying every {} ms",
                self.channel + 1,
                direction,
                tracker.count,
                policy.retry_interval_ms
            );
        }
    }

    fn agree(&mut self, direction: Direction) {
        let tracker = &mut self.trackers[direction.index()];
        if tracker.failed {
            info!("latch {}: {} confirmed, fail state cleared", self.channel + 1, direction);
        }
        tracker.clear();
    }
}

// ---------------------------------------------------------------------------
// Operator-facing interface
// ---------------------------------------------------------------------------

/// Common surface of both actuator variants.
pub trait Latch {
    fn core(&self) -> &LatchCore;
    fn core_mut(&mut self) -> &mut LatchCore;

    /// One control cycle.  Never blocks.
    fn handle(&mut self, now_ms: u64, action: bool, feedback: bool);

    /// Drive every coil this latch controls to its idle level.
    fn release_outputs(&mut self);

    /// Pulse completion reported by an external executor.
    fn acknowledge(&mut self, _direction: Direction) {}

    /// A pulse request that could not be dispatched since the last call.
    fn take_dropped(&mut self) -> Option<Direction> {
        None
    }

    fn set_auto(&mut self) {
        self.core_mut().enter(LatchMode::Auto);
    }

    fn set_manual(&mut self) {
        if self.core_mut().enter(LatchMode::Manual).is_some() {
            self.release_outputs();
        }
    }

    fn stop(&mut self) {
        if self.core_mut().enter(LatchMode::Stopped).is_some() {
            self.release_outputs();
        }
    }

    /// Operator SET pulse (manual mode only).
    fn set(&mut self) {
        self.core_mut().request(Direction::On);
    }

    /// Operator RESET pulse (manual mode only).
    fn reset(&mut self) {
        self.core_mut().request(Direction::Off);
    }

    fn mode(&self) -> LatchMode {
        self.core().mode()
    }

    fn is_failed_on(&self) -> bool {
        self.core().tracker(Direction::On).is_failed()
    }

    fn is_failed_off(&self) -> bool {
        self.core().tracker(Direction::Off).is_failed()
    }

    fn fail_count(&self, direction: Direction) -> u32 {
        self.core().tracker(direction).count()
    }
}
