//! GPIO / peripheral pin assignments for the three-channel load board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.  Arrays are indexed by channel id.

use crate::CHANNEL_COUNT;

// ---------------------------------------------------------------------------
// Latching relay coils (one SET and one RESET coil per channel)
// ---------------------------------------------------------------------------

/// Digital outputs driving the relay SET (close) coil.
pub const RELAY_ON_GPIO: [i32; CHANNEL_COUNT] = [26, 18, 22];
/// Digital outputs driving the relay RESET (open) coil.
pub const RELAY_OFF_GPIO: [i32; CHANNEL_COUNT] = [25, 19, 23];

// ---------------------------------------------------------------------------
// Relay position feedback (auxiliary contact, active-low with pull-up)
// ---------------------------------------------------------------------------

pub const RELAY_FEEDBACK_GPIO: [i32; CHANNEL_COUNT] = [27, 13, 21];

// ---------------------------------------------------------------------------
// Analog inputs (ADC1)
// ---------------------------------------------------------------------------

/// CC6940 hall current sensors.  GPIO 36/39/34 = ADC1 channel 0/3/6.
pub const CURRENT_ADC_GPIO: [i32; CHANNEL_COUNT] = [36, 39, 34];
pub const CURRENT_ADC_CHANNEL: [u32; CHANNEL_COUNT] = [0, 3, 6];

/// Bus voltage through the resistive divider.  GPIO 35 = ADC1 channel 7.
pub const VOLTAGE_ADC_GPIO: i32 = 35;
pub const VOLTAGE_ADC_CHANNEL: u32 = 7;

// ---------------------------------------------------------------------------
// ADC scaling
// ---------------------------------------------------------------------------

/// 12-bit ADC full-scale count.
pub const ADC_MAX_RAW: u16 = 4095;
/// Input range at 12 dB attenuation, in millivolts.
pub const ADC_FULL_SCALE_MV: u32 = 3300;
