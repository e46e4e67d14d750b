//! Control service: the hexagonal core.
//!
//! [`ControlService`] owns one [`LoadChannel`] per relay (protection engine
//! plus latch actuator) and runs them once per control cycle.  All I/O
//! flows through port traits injected at call sites, so the whole service
//! is testable with mock adapters.
//!
//! ```text
//!    SamplePort ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!  FeedbackPort ──▶ │      ControlService       │
//!    ParamStore ◀──▶│ Engine ─▶ Latch (×3)      │ ──▶ StatusSnapshot
//!                   └──────────────────────────┘
//! ```

use log::{info, warn};

use crate::CHANNEL_COUNT;
use crate::config::{ProtectionParams, SystemConfig};
use crate::error::{ConfigError, Result};
use crate::latch::{Direction, Latch, LatchMode, PulseCommand, PulseQueue};
use crate::protection::ProtectionEngine;
use crate::sensors::ChannelSample;
use crate::status::{ChannelFeedback, FaultFlags, FeedbackStatus, StatusSnapshot, SystemStatus};

use super::commands::ControlCommand;
use super::events::ControlEvent;
use super::ports::{EventSink, FeedbackPort, ParamStore, SamplePort};

// ───────────────────────────────────────────────────────────────
// LoadChannel
// ───────────────────────────────────────────────────────────────

/// Everything that belongs to one protected load.
pub struct LoadChannel<L> {
    pub engine: ProtectionEngine,
    pub latch: L,
    sample: ChannelSample,
    feedback: bool,
}

impl<L: Latch> LoadChannel<L> {
    pub fn new(params: ProtectionParams, latch: L) -> Self {
        Self {
            engine: ProtectionEngine::new(params),
            latch,
            sample: ChannelSample::default(),
            feedback: false,
        }
    }

    /// Last sample fed to the engine.
    pub fn sample(&self) -> ChannelSample {
        self.sample
    }

    /// Last debounced relay position.
    pub fn feedback(&self) -> bool {
        self.feedback
    }
}

// ───────────────────────────────────────────────────────────────
// ControlService
// ───────────────────────────────────────────────────────────────

pub struct ControlService<L> {
    channels: [LoadChannel<L>; CHANNEL_COUNT],
    mode: LatchMode,
    system_voltage: i32,
    mcb_present_threshold: i32,
}

impl<L: Latch> ControlService<L> {
    /// Build the channel arena.  Latches start in Auto.
    pub fn new(config: &SystemConfig, latches: [L; CHANNEL_COUNT]) -> Self {
        let mut i = 0;
        let channels = latches.map(|latch| {
            let ch = LoadChannel::new(config.protection[i], latch);
            i += 1;
            ch
        });
        Self {
            channels,
            mode: LatchMode::Auto,
            system_voltage: 0,
            mcb_present_threshold: config.mcb_present_threshold,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Pull stored thresholds for every channel.  Channels without a
    /// stored set keep what they were built with; invalid stored sets are
    /// skipped.
    pub fn load_params(&mut self, store: &impl ParamStore) {
        for (i, ch) in self.channels.iter_mut().enumerate() {
            match store.load(i).and_then(|p| p.validate().map(|()| p)) {
                Ok(params) => ch.engine.set_params(params),
                Err(ConfigError::NotFound) => {
                    info!("load {}: no stored parameters, using defaults", i + 1);
                }
                Err(e) => warn!("load {}: stored parameters rejected: {}", i + 1, e),
            }
            ch.engine.print_params(i);
        }
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control cycle: sample → evaluate → actuate, per channel.
    pub fn tick(
        &mut self,
        now_ms: u64,
        hw: &mut (impl SamplePort + FeedbackPort),
        sink: &mut impl EventSink,
    ) {
        let frame = hw.read_samples();
        let feedback = hw.read_feedback(now_ms);
        self.system_voltage = frame.system_voltage;

        for (i, ch) in self.channels.iter_mut().enumerate() {
            let id = i as u8;
            let sample = frame.channels[i];
            ch.sample = sample;
            ch.feedback = feedback[i];

            let before = ch.engine.flags();
            let action = ch.engine.evaluate(now_ms, sample.voltage, sample.current);
            emit_fault_edges(id, before, ch.engine.flags(), sink);

            let failed_before = [ch.latch.is_failed_on(), ch.latch.is_failed_off()];
            ch.latch.handle(now_ms, action, ch.feedback);
            let failed_after = [ch.latch.is_failed_on(), ch.latch.is_failed_off()];

            for (direction, (was, is)) in [Direction::On, Direction::Off]
                .into_iter()
                .zip(failed_before.into_iter().zip(failed_after))
            {
                if !was && is {
                    sink.emit(&ControlEvent::ActuationFailed { channel: id, direction });
                } else if was && !is {
                    sink.emit(&ControlEvent::ActuationRecovered { channel: id, direction });
                }
            }

            while let Some(direction) = ch.latch.take_dropped() {
                sink.emit(&ControlEvent::PulseDropped { channel: id, direction });
            }
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an operator command.
    pub fn handle_command(
        &mut self,
        cmd: ControlCommand,
        store: &mut impl ParamStore,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        match cmd {
            ControlCommand::SetAuto => self.set_mode(LatchMode::Auto, sink),
            ControlCommand::SetManual => self.set_mode(LatchMode::Manual, sink),
            ControlCommand::Stop => self.set_mode(LatchMode::Stopped, sink),
            ControlCommand::PulseOn(channel) => self.channel_mut(channel)?.latch.set(),
            ControlCommand::PulseOff(channel) => self.channel_mut(channel)?.latch.reset(),
            ControlCommand::UpdateParams { channel, params } => {
                self.apply_params(channel, params)?;
                store.save(channel, &params)?;
                sink.emit(&ControlEvent::ParamsUpdated {
                    channel: channel as u8,
                });
            }
            ControlCommand::FactoryReset => {
                store.clear()?;
                let defaults = ProtectionParams::default();
                for channel in 0..CHANNEL_COUNT {
                    self.apply_params(channel, defaults)?;
                    store.save(channel, &defaults)?;
                    sink.emit(&ControlEvent::ParamsUpdated {
                        channel: channel as u8,
                    });
                }
                info!("protection parameters restored to defaults");
            }
        }
        Ok(())
    }

    /// Validate and apply thresholds to one channel.  Invalid hysteresis
    /// ordering is rejected rather than handed to the engine.
    pub fn apply_params(&mut self, channel: usize, params: ProtectionParams) -> Result<()> {
        params.validate()?;
        let ch = self.channel_mut(channel)?;
        ch.engine.set_params(params);
        ch.engine.print_params(channel);
        Ok(())
    }

    /// Route a pulse completion back to the latch that requested it.
    pub fn acknowledge(&mut self, cmd: PulseCommand) {
        match self.channels.get_mut(usize::from(cmd.channel())) {
            Some(ch) => ch.latch.acknowledge(cmd.direction()),
            None => warn!("completion for unknown channel: {:?}", cmd),
        }
    }

    /// Apply every completion the pulse worker has posted.
    pub fn drain_completions(&mut self, queue: &PulseQueue) -> usize {
        let done = queue.drain_completions();
        for &cmd in &done {
            self.acknowledge(cmd);
        }
        done.len()
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn mode(&self) -> LatchMode {
        self.mode
    }

    pub fn channel(&self, channel: usize) -> Option<&LoadChannel<L>> {
        self.channels.get(channel)
    }

    pub fn channel_mut(&mut self, channel: usize) -> Result<&mut LoadChannel<L>> {
        self.channels
            .get_mut(channel)
            .ok_or(ConfigError::UnknownChannel(channel).into())
    }

    /// Register-ready snapshot of the last cycle.
    pub fn status(&self) -> StatusSnapshot {
        let mut snap = StatusSnapshot {
            system_voltage: saturate_i16(self.system_voltage),
            system: SystemStatus {
                run: self.mode != LatchMode::Stopped,
                manual: self.mode == LatchMode::Manual,
            },
            ..StatusSnapshot::default()
        };
        let mut feedback = FeedbackStatus::default();
        for (i, ch) in self.channels.iter().enumerate() {
            snap.voltage[i] = saturate_i16(ch.sample.voltage);
            snap.current[i] = saturate_i16(ch.sample.current);
            snap.faults[i] = ch.engine.flags();
            feedback.channels[i] = ChannelFeedback {
                mcb_present: ch.sample.voltage > self.mcb_present_threshold,
                relay_closed: ch.feedback,
                on_failed: ch.latch.is_failed_on(),
                off_failed: ch.latch.is_failed_off(),
            };
        }
        snap.feedback = feedback;
        snap
    }

    // ── Internal ──────────────────────────────────────────────

    fn set_mode(&mut self, mode: LatchMode, sink: &mut impl EventSink) {
        for ch in &mut self.channels {
            match mode {
                LatchMode::Auto => ch.latch.set_auto(),
                LatchMode::Manual => ch.latch.set_manual(),
                LatchMode::Stopped => ch.latch.stop(),
            }
        }
        if self.mode != mode {
            sink.emit(&ControlEvent::ModeChanged {
                from: self.mode,
                to: mode,
            });
            self.mode = mode;
        }
    }
}

fn emit_fault_edges(channel: u8, before: FaultFlags, after: FaultFlags, sink: &mut impl EventSink) {
    let raised = after.bits() & !before.bits();
    let cleared = before.bits() & !after.bits();
    if raised != 0 {
        sink.emit(&ControlEvent::FaultRaised {
            channel,
            flags: FaultFlags::from_bits(raised),
        });
    }
    if cleared != 0 {
        sink.emit(&ControlEvent::FaultCleared {
            channel,
            flags: FaultFlags::from_bits(cleared),
        });
    }
}

fn saturate_i16(v: i32) -> i16 {
    v.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}
