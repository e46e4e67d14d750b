//! Unified error types for the load controller.
//!
//! The control path itself never fails: protection faults and relay
//! actuation failures are state (flags + counters), not errors.  The types
//! here cover the fallible edges only: configuration validation, the
//! parameter store, pulse-queue submission and peripheral bring-up.
//! All variants are `Copy` so they can be passed through the control loop
//! without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A configuration or parameter set was rejected.
    Config(ConfigError),
    /// A pulse request could not be handed to the pulse worker.
    Dispatch(DispatchError),
    /// Peripheral initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Dispatch(e) => write!(f, "dispatch: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Overvoltage reconnect is not strictly below the disconnect threshold.
    OvervoltageBand,
    /// Undervoltage reconnect is not strictly above the disconnect threshold.
    UndervoltageBand,
    /// Short-circuit threshold does not sit above the overcurrent threshold.
    ShortCircuitBelowOvercurrent,
    /// Channel index outside the board's channel range.
    UnknownChannel(usize),
    /// No stored parameters exist for the requested channel.
    NotFound,
    /// Parameter store backend failed.
    Storage,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OvervoltageBand => write!(f, "overvoltage reconnect must be below disconnect"),
            Self::UndervoltageBand => write!(f, "undervoltage reconnect must be above disconnect"),
            Self::ShortCircuitBelowOvercurrent => {
                write!(f, "short-circuit threshold must exceed overcurrent threshold")
            }
            Self::UnknownChannel(ch) => write!(f, "unknown channel {ch}"),
            Self::NotFound => write!(f, "parameters not found"),
            Self::Storage => write!(f, "parameter storage failure"),
        }
    }
}

impl core::error::Error for ConfigError {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Pulse dispatch errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// The pulse queue stayed full for the whole send timeout.
    QueueFull,
    /// The worker has no generator pair for the addressed channel.
    UnknownChannel(u8),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueFull => write!(f, "pulse queue full"),
            Self::UnknownChannel(ch) => write!(f, "no pulse outputs for channel {ch}"),
        }
    }
}

impl core::error::Error for DispatchError {}

impl From<DispatchError> for Error {
    fn from(e: DispatchError) -> Self {
        Self::Dispatch(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
