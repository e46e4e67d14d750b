//! System configuration parameters
//!
//! All tunable parameters for the load controller.  Protection thresholds
//! are owned by the parameter store and handed to each channel's engine at
//! setup and on every configuration write.

use serde::{Deserialize, Serialize};

use crate::CHANNEL_COUNT;
use crate::error::ConfigError;
use crate::sensors::current::CurrentSenseCalibration;

/// Per-channel protection thresholds.
///
/// Units: voltage in 0.1 V, current in 0.01 A, times in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtectionParams {
    pub overvoltage_disconnect: u16,
    pub overvoltage_reconnect: u16,
    pub undervoltage_disconnect: u16,
    pub undervoltage_reconnect: u16,
    pub overcurrent_disconnect: u16,
    pub overcurrent_detection_ms: u32,
    pub overcurrent_reconnect_ms: u32,
    pub short_circuit_disconnect: u16,
    pub short_circuit_detection_ms: u32,
    pub short_circuit_reconnect_ms: u32,
    /// Inverts the output action bit (sink vs source wiring).
    pub active_low: bool,
}

impl Default for ProtectionParams {
    fn default() -> Self {
        Self {
            overvoltage_disconnect: 600, // 60.0 V
            overvoltage_reconnect: 580,
            undervoltage_disconnect: 500, // 50.0 V
            undervoltage_reconnect: 510,
            overcurrent_disconnect: 1000, // 10.00 A
            overcurrent_detection_ms: 2000,
            overcurrent_reconnect_ms: 4000,
            short_circuit_disconnect: 2000, // 20.00 A
            short_circuit_detection_ms: 20,
            short_circuit_reconnect_ms: 4000,
            active_low: false,
        }
    }
}

impl ProtectionParams {
    /// Check band ordering.  The engine accepts any set; callers that want
    /// to refuse oscillating configurations run this first.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.overvoltage_reconnect >= self.overvoltage_disconnect {
            return Err(ConfigError::OvervoltageBand);
        }
        if self.undervoltage_reconnect <= self.undervoltage_disconnect {
            return Err(ConfigError::UndervoltageBand);
        }
        if self.short_circuit_disconnect <= self.overcurrent_disconnect {
            return Err(ConfigError::ShortCircuitBelowOvercurrent);
        }
        Ok(())
    }
}

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Timing ---
    /// Control loop period (milliseconds)
    pub control_loop_interval_ms: u32,

    // --- Relay pulses ---
    /// Coil energise time per pulse (milliseconds)
    pub pulse_on_ms: u32,
    /// Idle gap after each pulse before the next may start (milliseconds)
    pub pulse_off_ms: u32,
    /// Relay driver outputs are active-low
    pub pulse_active_low: bool,

    // --- Retry ---
    /// Minimum spacing of re-pulses while in fail state (milliseconds)
    pub retry_interval_ms: u32,
    /// Pulses allowed before a direction enters fail state
    pub max_retry: u8,

    // --- Pulse worker ---
    /// How long a pulse request may wait for queue space (milliseconds)
    pub queue_send_timeout_ms: u32,
    /// Worker sleep between generator ticks (milliseconds)
    pub worker_poll_ms: u32,

    // --- Feedback ---
    /// Contact bounce filter (milliseconds)
    pub feedback_debounce_ms: u32,
    /// Hold time before a closed contact is reported (milliseconds)
    pub feedback_press_ms: u32,
    /// Load voltage above which the upstream breaker counts as closed
    /// (sampled voltage units)
    pub mcb_present_threshold: i32,
    /// Raw bus-voltage ADC counts per sampled voltage unit
    pub voltage_adc_divisor: u16,

    // --- Per channel ---
    pub protection: [ProtectionParams; CHANNEL_COUNT],
    pub current_sense: [CurrentSenseCalibration; CHANNEL_COUNT],
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            control_loop_interval_ms: 5,

            pulse_on_ms: 100,
            pulse_off_ms: 100,
            pulse_active_low: false,

            retry_interval_ms: 2000,
            max_retry: 5,

            queue_send_timeout_ms: 10,
            worker_poll_ms: 1,

            feedback_debounce_ms: 20,
            feedback_press_ms: 100,
            mcb_present_threshold: 5,
            voltage_adc_divisor: 6,

            protection: [ProtectionParams::default(); CHANNEL_COUNT],
            current_sense: [CurrentSenseCalibration::default(); CHANNEL_COUNT],
        }
    }
}
