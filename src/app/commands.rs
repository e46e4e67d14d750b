//! Inbound commands to the control service.
//!
//! These represent actions requested by the operator surface (coil bank,
//! register writes, serial console) that the
//! [`ControlService`](super::service::ControlService) interprets.

use crate::config::ProtectionParams;

/// Commands that external adapters can send into the control core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// Every channel follows its protection engine.
    SetAuto,

    /// Operator takes over every relay.
    SetManual,

    /// Halt all actuation and release the coil outputs.
    Stop,

    /// Operator SET pulse on a channel (manual mode only).
    PulseOn(usize),

    /// Operator RESET pulse on a channel (manual mode only).
    PulseOff(usize),

    /// Validate, persist and apply new thresholds for a channel.
    UpdateParams {
        channel: usize,
        params: ProtectionParams,
    },

    /// Restore and persist default thresholds on every channel.
    FactoryReset,
}
