//! LoadControl firmware library.
//!
//! Three-channel DC load protection with latching-relay actuation.
//! Exposes the pure-logic modules for integration testing.  All
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

/// Protected load channels on the board.
pub const CHANNEL_COUNT: usize = 3;

pub mod app;
pub mod coils;
pub mod config;
pub mod error;
pub mod latch;
pub mod pins;
pub mod protection;
pub mod status;

pub mod adapters;
pub mod drivers;
pub mod sensors;
