//! Sensor subsystem: per-channel electrical samples and current-sense
//! conversion.
//!
//! Samples arrive already scaled to the protection engine's units
//! (voltage in 0.1 V, current in 0.01 A).  Scaling is the sampler's job.

pub mod current;

use crate::CHANNEL_COUNT;

/// One channel's reading for a single control cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelSample {
    pub voltage: i32,
    /// Signed; the engine only looks at the magnitude.
    pub current: i32,
}

/// Everything sampled in one control cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleFrame {
    pub channels: [ChannelSample; CHANNEL_COUNT],
    pub system_voltage: i32,
}
