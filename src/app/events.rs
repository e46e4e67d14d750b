//! Outbound control events.
//!
//! The [`ControlService`](super::service::ControlService) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Every event
//! is edge-triggered: it fires once per change, never per cycle.

use crate::latch::{Direction, LatchMode};
use crate::status::FaultFlags;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    /// Faults newly latched on a channel (only the new bits are set).
    FaultRaised { channel: u8, flags: FaultFlags },

    /// Faults released on a channel (only the released bits are set).
    FaultCleared { channel: u8, flags: FaultFlags },

    /// A direction exhausted its retries and is now rate-limited.
    ActuationFailed { channel: u8, direction: Direction },

    /// Feedback agreed again after a fail state.
    ActuationRecovered { channel: u8, direction: Direction },

    /// Board-wide latch mode changed.
    ModeChanged { from: LatchMode, to: LatchMode },

    /// A pulse request could not be queued and was abandoned.
    PulseDropped { channel: u8, direction: Direction },

    /// New protection thresholds were applied to a channel.
    ParamsUpdated { channel: u8 },
}
