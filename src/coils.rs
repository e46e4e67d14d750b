//! Manual-override coil bank.
//!
//! A protocol task writes boolean coils; the control loop drains them once
//! per cycle and turns them into [`ControlCommand`]s.
//!
//! ```text
//!  coil 0 ─ relay 1 ON     coil 3 ─ relay 2 OFF
//!  coil 1 ─ relay 1 OFF    coil 4 ─ relay 3 ON
//!  coil 2 ─ relay 2 ON     coil 5 ─ relay 3 OFF
//!  coil 6 ─ manual mode (level, not one-shot)
//! ```
//!
//! Pulse coils are one-shot: a written `true` is routed once and then
//! cleared.  They are only routed while the manual bit is set; otherwise
//! they are discarded.

use core::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use heapless::Vec;
use log::debug;

use crate::CHANNEL_COUNT;
use crate::app::commands::ControlCommand;

/// Pulse coils, two per channel.
pub const PULSE_COIL_COUNT: usize = CHANNEL_COUNT * 2;
/// Index of the manual-mode coil.
pub const MANUAL_COIL: usize = PULSE_COIL_COUNT;
pub const COIL_COUNT: usize = PULSE_COIL_COUNT + 1;

/// Lock-free coil storage shared between the writer task and the loop.
pub struct CoilBank {
    pending: AtomicU8,
    manual: AtomicBool,
    manual_dirty: AtomicBool,
}

impl Default for CoilBank {
    fn default() -> Self {
        Self::new()
    }
}

impl CoilBank {
    pub const fn new() -> Self {
        Self {
            pending: AtomicU8::new(0),
            manual: AtomicBool::new(false),
            manual_dirty: AtomicBool::new(false),
        }
    }

    /// Write one coil.  Returns `false` for an out-of-range index.
    pub fn write(&self, index: usize, value: bool) -> bool {
        match index {
            i if i < PULSE_COIL_COUNT => {
                if value {
                    self.pending.fetch_or(1 << i, Ordering::AcqRel);
                }
                true
            }
            MANUAL_COIL => {
                if self.manual.swap(value, Ordering::AcqRel) != value {
                    self.manual_dirty.store(true, Ordering::Release);
                }
                true
            }
            _ => false,
        }
    }

    /// Current coil values as a bitfield (bit n = coil n).
    pub fn bits(&self) -> u16 {
        let manual = u16::from(self.manual.load(Ordering::Acquire));
        u16::from(self.pending.load(Ordering::Acquire)) | (manual << MANUAL_COIL)
    }

    /// Take everything written since the last call.  A mode change comes
    /// first so pulses written alongside it see the new mode.
    pub fn take_commands(&self) -> Vec<ControlCommand, COIL_COUNT> {
        let mut out = Vec::new();
        let manual = self.manual.load(Ordering::Acquire);
        if self.manual_dirty.swap(false, Ordering::AcqRel) {
            let cmd = if manual {
                ControlCommand::SetManual
            } else {
                ControlCommand::SetAuto
            };
            let _ = out.push(cmd);
        }

        let pending = self.pending.swap(0, Ordering::AcqRel);
        if pending == 0 {
            return out;
        }
        if !manual {
            debug!("coils: 0b{:06b} ignored outside manual mode", pending);
            return out;
        }
        for i in 0..PULSE_COIL_COUNT {
            if pending & (1 << i) == 0 {
                continue;
            }
            let channel = i / 2;
            let cmd = if i % 2 == 0 {
                ControlCommand::PulseOn(channel)
            } else {
                ControlCommand::PulseOff(channel)
            };
            let _ = out.push(cmd);
        }
        out
    }
}
