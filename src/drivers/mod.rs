//! Pin-level drivers, hardware initialisation, and task helpers.

pub mod feedback;
pub mod gpio;
pub mod hw_init;
pub mod pulse;
pub mod task_pin;
