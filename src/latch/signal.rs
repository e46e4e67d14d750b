//! Serialised latch actuator.
//!
//! Instead of driving generators itself, this variant emits a
//! [`PulseCommand`] for the pulse worker and marks that direction in
//! flight.  The direction stays blocked until the worker's completion is
//! fed back through [`Latch::acknowledge`].  A request that cannot be
//! submitted releases its guard right here, so a full queue never leaves
//! a direction stuck.  Leaving auto mode withdraws requests the worker has
//! not started yet; a pulse already on the coil runs to the end.

use log::{debug, warn};

use heapless::Vec;

use super::queue::{COMMAND_DEPTH, PulseCommand};
use super::{Direction, Latch, LatchCore, PulseDriver, RetryPolicy};
use crate::error::DispatchError;

/// Where a `SignalLatch` sends its pulse requests.
pub trait PulseSink {
    fn submit(&mut self, cmd: PulseCommand) -> Result<(), DispatchError>;

    /// Withdraw every request for `channel` the executor has not taken yet.
    fn cancel(&mut self, channel: u8) -> Vec<PulseCommand, COMMAND_DEPTH>;
}

pub struct SignalLatch<S> {
    core: LatchCore,
    sink: S,
    in_flight: [bool; 2],
    dropped: [bool; 2],
}

impl<S: PulseSink> SignalLatch<S> {
    pub fn new(channel: u8, policy: RetryPolicy, sink: S) -> Self {
        Self {
            core: LatchCore::new(channel, policy),
            sink,
            in_flight: [false; 2],
            dropped: [false; 2],
        }
    }

    pub fn is_in_flight(&self, direction: Direction) -> bool {
        self.in_flight[direction.index()]
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }
}

/// Borrowed view handed to the shared decision logic for one cycle.
struct Dispatch<'a, S> {
    channel: u8,
    sink: &'a mut S,
    in_flight: &'a mut [bool; 2],
    dropped: &'a mut [bool; 2],
}

impl<S: PulseSink> PulseDriver for Dispatch<'_, S> {
    fn busy(&self, direction: Direction) -> bool {
        self.in_flight[direction.index()]
    }

    fn fire(&mut self, direction: Direction, _now_ms: u64) -> bool {
        let slot = direction.index();
        self.in_flight[slot] = true;
        match self.sink.submit(PulseCommand::new(self.channel, direction)) {
            Ok(()) => true,
            Err(e) => {
                self.in_flight[slot] = false;
                self.dropped[slot] = true;
                warn!("latch {}: {} pulse dropped: {}", self.channel + 1, direction, e);
                false
            }
        }
    }
}

impl<S: PulseSink> Latch for SignalLatch<S> {
    fn core(&self) -> &LatchCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut LatchCore {
        &mut self.core
    }

    fn handle(&mut self, now_ms: u64, action: bool, feedback: bool) {
        let mut dispatch = Dispatch {
            channel: self.core.channel(),
            sink: &mut self.sink,
            in_flight: &mut self.in_flight,
            dropped: &mut self.dropped,
        };
        self.core.step(now_ms, action, feedback, &mut dispatch);
    }

    /// Coils belong to the worker, and a started pulse always runs to the
    /// end of its window.  Queued requests are withdrawn so they never reach
    /// a coil.
    fn release_outputs(&mut self) {
        for cmd in self.sink.cancel(self.core.channel()) {
            self.in_flight[cmd.direction().index()] = false;
            debug!("latch {}: queued {} pulse cancelled", cmd.channel() + 1, cmd.direction());
        }
    }

    fn acknowledge(&mut self, direction: Direction) {
        self.in_flight[direction.index()] = false;
    }

    fn take_dropped(&mut self) -> Option<Direction> {
        for direction in [Direction::On, Direction::Off] {
            let slot = &mut self.dropped[direction.index()];
            if *slot {
                *slot = false;
                return Some(direction);
            }
        }
        None
    }
}
