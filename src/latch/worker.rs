//! Single pulse worker.
//!
//! Owns every channel's SET/RESET generator pair and executes queued
//! `PulseCommand`s strictly one at a time, so no two coils on the board
//! are ever energised together.  After each pulse (on phase and guard
//! phase) the command is posted back as a completion.

use std::time::Duration;

use embedded_hal::digital::OutputPin;
use futures_lite::future::block_on;
use log::{debug, error, warn};

use super::PulsePair;
use super::queue::{PulseCommand, PulseQueue};
use crate::app::ports::Clock;
use crate::error::DispatchError;

pub struct PulseWorker<P, const N: usize> {
    pairs: [PulsePair<P>; N],
    poll_ms: u32,
}

impl<P: OutputPin, const N: usize> PulseWorker<P, N> {
    pub fn new(pairs: [PulsePair<P>; N], poll_ms: u32) -> Self {
        Self { pairs, poll_ms }
    }

    pub fn pair(&self, channel: usize) -> Option<&PulsePair<P>> {
        self.pairs.get(channel)
    }

    /// Fire one pulse and wait for its whole on+off window.
    ///
    /// `pause` runs between generator ticks; the thread loop sleeps there.
    pub fn execute<C: Clock>(
        &mut self,
        cmd: PulseCommand,
        clock: &C,
        mut pause: impl FnMut(),
    ) -> Result<(), DispatchError> {
        let pair = self
            .pairs
            .get_mut(usize::from(cmd.channel()))
            .ok_or(DispatchError::UnknownChannel(cmd.channel()))?;
        let generator = pair.get_mut(cmd.direction());

        if !generator.set(clock.now_ms()) {
            // Only reachable if something else ticked this generator.
            warn!("pulse worker: {:?} already running", cmd);
        }
        while generator.is_running() {
            pause();
            generator.tick(clock.now_ms());
        }
        debug!("pulse worker: {:?} done", cmd);
        Ok(())
    }

    /// Receive, execute and acknowledge one command.  Blocks until a
    /// command arrives.
    pub fn serve_one<C: Clock>(&mut self, queue: &PulseQueue, clock: &C) {
        let cmd = block_on(queue.commands.receive());
        let poll = Duration::from_millis(u64::from(self.poll_ms));
        if let Err(e) = self.execute(cmd, clock, || std::thread::sleep(poll)) {
            error!("pulse worker: {:?} not executed: {}", cmd, e);
        }
        // Completion is posted even on failure so the latch guard clears.
        if queue.completions.try_send(cmd).is_err() {
            error!("pulse worker: completion queue full, {:?} lost", cmd);
        }
    }

    /// Worker thread body.
    pub fn run<C: Clock>(mut self, queue: &PulseQueue, clock: C) -> ! {
        loop {
            self.serve_one(queue, &clock);
        }
    }
}
