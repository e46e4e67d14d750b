//! Port traits: the hexagonal boundary between control logic and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ControlService (domain)
//! ```
//!
//! Driven adapters (board sampling, feedback contacts, parameter storage,
//! event sinks, clocks) implement these traits.  The
//! [`ControlService`](super::service::ControlService) consumes them via
//! generics, so the domain core never touches hardware directly.

use crate::CHANNEL_COUNT;
use crate::config::ProtectionParams;
use crate::error::ConfigError;
use crate::sensors::SampleFrame;

// ───────────────────────────────────────────────────────────────
// Clock
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond time source.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Sampling port (hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Supplies one frame of scaled voltage/current readings per cycle.
pub trait SamplePort {
    fn read_samples(&mut self) -> SampleFrame;
}

// ───────────────────────────────────────────────────────────────
// Feedback port (hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Supplies the debounced relay position of every channel
/// (`true` = relay closed).
pub trait FeedbackPort {
    fn read_feedback(&mut self, now_ms: u64) -> [bool; CHANNEL_COUNT];
}

// ───────────────────────────────────────────────────────────────
// Event sink (domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`ControlEvent`](super::events::ControlEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::ControlEvent);
}

// ───────────────────────────────────────────────────────────────
// Parameter store (domain ↔ persistent settings)
// ───────────────────────────────────────────────────────────────

/// Per-channel protection parameter persistence.
///
/// Implementations store whatever they are given; validation happens in
/// the service before `save` is called.
pub trait ParamStore {
    /// Stored parameters for `channel`, or [`ConfigError::NotFound`].
    fn load(&self, channel: usize) -> Result<ProtectionParams, ConfigError>;

    fn save(&mut self, channel: usize, params: &ProtectionParams) -> Result<(), ConfigError>;

    /// Forget every stored set.
    fn clear(&mut self) -> Result<(), ConfigError>;
}
