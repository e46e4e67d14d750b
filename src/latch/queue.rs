//! Pulse serialisation channels.
//!
//! Uses `embassy-sync` bounded channels to hand pulse requests from the
//! control loop to the single pulse worker, and completions back.  Only
//! one coil on the whole board is ever energised at a time.
//!
//! ```text
//! ┌──────────────┐  PulseCommand  ┌──────────────┐
//! │ Control Loop │──────────────▶│ Pulse Worker │
//! │ (SignalLatch)│◀──────────────│ (generators) │
//! └──────────────┘   completion   └──────────────┘
//! ```

use std::time::{Duration, Instant};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::Vec;
use log::error;

use super::Direction;
use super::signal::PulseSink;
use crate::error::DispatchError;

/// Channel depth for pulse requests.
pub const COMMAND_DEPTH: usize = 4;

/// Channel depth for completions.  At least the number of requests that
/// can be in flight at once (two directions per channel).
pub const COMPLETION_DEPTH: usize = 8;

/// A single coil pulse, addressed by channel id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseCommand {
    On(u8),
    Off(u8),
}

impl PulseCommand {
    pub fn new(channel: u8, direction: Direction) -> Self {
        match direction {
            Direction::On => Self::On(channel),
            Direction::Off => Self::Off(channel),
        }
    }

    pub fn channel(self) -> u8 {
        match self {
            Self::On(ch) | Self::Off(ch) => ch,
        }
    }

    pub fn direction(self) -> Direction {
        match self {
            Self::On(_) => Direction::On,
            Self::Off(_) => Direction::Off,
        }
    }
}

pub struct PulseQueue {
    /// Control loop → worker.
    pub commands: Channel<CriticalSectionRawMutex, PulseCommand, COMMAND_DEPTH>,
    /// Worker → control loop.
    pub completions: Channel<CriticalSectionRawMutex, PulseCommand, COMPLETION_DEPTH>,
}

impl Default for PulseQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl PulseQueue {
    pub const fn new() -> Self {
        Self {
            commands: Channel::new(),
            completions: Channel::new(),
        }
    }

    /// Non-blocking: take every completion posted so far.
    pub fn drain_completions(&self) -> Vec<PulseCommand, COMPLETION_DEPTH> {
        let mut out = Vec::new();
        while !out.is_full() {
            match self.completions.try_receive() {
                Ok(cmd) => {
                    // Capacity checked by the loop condition.
                    let _ = out.push(cmd);
                }
                Err(_) => break,
            }
        }
        out
    }
}

/// `PulseSink` that enqueues onto a [`PulseQueue`] with a send timeout.
pub struct QueueSink<'a> {
    queue: &'a PulseQueue,
    timeout: Duration,
}

impl<'a> QueueSink<'a> {
    pub fn new(queue: &'a PulseQueue, timeout_ms: u32) -> Self {
        Self {
            queue,
            timeout: Duration::from_millis(u64::from(timeout_ms)),
        }
    }
}

impl PulseSink for QueueSink<'_> {
    fn submit(&mut self, cmd: PulseCommand) -> Result<(), DispatchError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            if self.queue.commands.try_send(cmd).is_ok() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DispatchError::QueueFull);
            }
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    /// Drains the request channel and puts back, in order, whatever belongs
    /// to other channels.  Only the control loop sends, so the re-posted
    /// requests always fit.
    fn cancel(&mut self, channel: u8) -> Vec<PulseCommand, COMMAND_DEPTH> {
        let mut cancelled = Vec::new();
        let mut kept: Vec<PulseCommand, COMMAND_DEPTH> = Vec::new();
        while let Ok(cmd) = self.queue.commands.try_receive() {
            let bucket = if cmd.channel() == channel { &mut cancelled } else { &mut kept };
            // At most COMMAND_DEPTH commands can be drained.
            let _ = bucket.push(cmd);
        }
        for cmd in kept {
            if self.queue.commands.try_send(cmd).is_err() {
                error!("pulse queue: {:?} lost while cancelling channel {}", cmd, channel);
            }
        }
        cancelled
    }
}
