//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured control events to the
//! ESP-IDF logger (UART in production).  A register-mapped or network
//! reporter would implement the same trait.

use log::{error, info, warn};

use crate::app::events::ControlEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`ControlEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &ControlEvent) {
        match event {
            ControlEvent::FaultRaised { channel, flags } => {
                error!("FAULT | load {} raised 0b{:04b} ({:?})", channel + 1, flags.bits(), flags);
            }
            ControlEvent::FaultCleared { channel, flags } => {
                info!("FAULT | load {} cleared 0b{:04b}", channel + 1, flags.bits());
            }
            ControlEvent::ActuationFailed { channel, direction } => {
                warn!("RELAY | load {} {} failed, rate-limited retry", channel + 1, direction);
            }
            ControlEvent::ActuationRecovered { channel, direction } => {
                info!("RELAY | load {} {} confirmed", channel + 1, direction);
            }
            ControlEvent::ModeChanged { from, to } => {
                info!("MODE  | {:?} -> {:?}", from, to);
            }
            ControlEvent::PulseDropped { channel, direction } => {
                warn!("PULSE | load {} {} dropped (queue full)", channel + 1, direction);
            }
            ControlEvent::ParamsUpdated { channel } => {
                info!("PARAM | load {} thresholds updated", channel + 1);
            }
        }
    }
}
