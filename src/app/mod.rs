//! Application core: pure domain logic, zero I/O.
//!
//! Per-channel protection evaluation, latch actuation and operator
//! command handling.  All interaction with hardware happens through
//! **port traits** defined in [`ports`], keeping this layer fully testable
//! without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
