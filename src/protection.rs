//! Per-channel protection engine.
//!
//! `evaluate()` runs once per control cycle and updates four sticky fault
//! bits, then derives the output action.  Evaluation order is fixed:
//!
//! 1. magnitude of the current
//! 2. overvoltage band
//! 3. undervoltage band
//! 4. short circuit (supersedes overcurrent)
//! 5. overcurrent, only while no short circuit is latched
//! 6. action = `!active_low` with no faults, `active_low` otherwise
//!
//! Voltage faults use plain hysteresis.  Current faults are timed: the
//! excursion must persist for the detection time before the fault trips,
//! and the current must stay at or below the threshold for the reconnect
//! time before it clears.  Nothing here fails or performs I/O.

use log::info;

use crate::config::ProtectionParams;
use crate::status::FaultFlags;

// ---------------------------------------------------------------------------
// Timed fault
// ---------------------------------------------------------------------------

/// Debounced trip / debounced clear for one current threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct TimedFault {
    active: bool,
    /// First sample of the current over-threshold run.
    detect_since: Option<u64>,
    /// Trip time, or last over-threshold sample while tripped.
    reconnect_since: Option<u64>,
}

impl TimedFault {
    fn update(&mut self, now_ms: u64, over: bool, detection_ms: u32, reconnect_ms: u32) {
        if self.active {
            if over {
                self.reconnect_since = Some(now_ms);
                return;
            }
            let since = *self.reconnect_since.get_or_insert(now_ms);
            if now_ms.saturating_sub(since) >= u64::from(reconnect_ms) {
                *self = Self::default();
            }
        } else if over {
            let since = *self.detect_since.get_or_insert(now_ms);
            if now_ms.saturating_sub(since) >= u64::from(detection_ms) {
                self.active = true;
                self.detect_since = None;
                self.reconnect_since = Some(now_ms);
            }
        } else {
            self.detect_since = None;
        }
    }

    /// Drop the fault and forget any partial detection run.
    fn clear(&mut self) {
        *self = Self::default();
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ProtectionEngine {
    params: ProtectionParams,
    overvoltage: bool,
    undervoltage: bool,
    overcurrent: TimedFault,
    short_circuit: TimedFault,
}

impl ProtectionEngine {
    pub fn new(params: ProtectionParams) -> Self {
        Self {
            params,
            overvoltage: false,
            undervoltage: false,
            overcurrent: TimedFault::default(),
            short_circuit: TimedFault::default(),
        }
    }

    /// Feed one sample and return the output action.
    ///
    /// `voltage` is in 0.1 V and `current` in 0.01 A; the sign of the
    /// current is ignored.
    pub fn evaluate(&mut self, now_ms: u64, voltage: i32, current: i32) -> bool {
        let p = &self.params;
        let current = current.unsigned_abs();

        if voltage > i32::from(p.overvoltage_disconnect) {
            self.overvoltage = true;
        }
        if voltage < i32::from(p.overvoltage_reconnect) {
            self.overvoltage = false;
        }

        if voltage < i32::from(p.undervoltage_disconnect) {
            self.undervoltage = true;
        }
        if voltage > i32::from(p.undervoltage_reconnect) {
            self.undervoltage = false;
        }

        let was_short = self.short_circuit.active;
        self.short_circuit.update(
            now_ms,
            current > u32::from(p.short_circuit_disconnect),
            p.short_circuit_detection_ms,
            p.short_circuit_reconnect_ms,
        );
        if self.short_circuit.active || was_short {
            // Latched, or just released: overcurrent restarts from scratch.
            self.overcurrent.clear();
        }

        if !self.short_circuit.active {
            self.overcurrent.update(
                now_ms,
                current > u32::from(p.overcurrent_disconnect),
                p.overcurrent_detection_ms,
                p.overcurrent_reconnect_ms,
            );
        }

        self.action()
    }

    pub fn is_overvoltage(&self) -> bool {
        self.overvoltage
    }

    pub fn is_undervoltage(&self) -> bool {
        self.undervoltage
    }

    pub fn is_overcurrent(&self) -> bool {
        self.overcurrent.active
    }

    pub fn is_short_circuit(&self) -> bool {
        self.short_circuit.active
    }

    /// `!active_low` while healthy, `active_low` while any fault is latched.
    pub fn action(&self) -> bool {
        if self.flags().any() {
            self.params.active_low
        } else {
            !self.params.active_low
        }
    }

    pub fn flags(&self) -> FaultFlags {
        FaultFlags {
            undervoltage: self.undervoltage,
            overvoltage: self.overvoltage,
            overcurrent: self.overcurrent.active,
            short_circuit: self.short_circuit.active,
        }
    }

    /// Packed fault word for the reporting layer.
    pub fn status(&self) -> u16 {
        self.flags().bits()
    }

    pub fn params(&self) -> &ProtectionParams {
        &self.params
    }

    /// Replace the thresholds.  Latched faults and running timers are kept;
    /// the new values apply from the next `evaluate()`.
    pub fn set_params(&mut self, params: ProtectionParams) {
        self.params = params;
    }

    pub fn print_params(&self, channel: usize) {
        let p = &self.params;
        info!("load {} protection parameters:", channel + 1);
        info!("  overvoltage disconnect   : {}", p.overvoltage_disconnect);
        info!("  overvoltage reconnect    : {}", p.overvoltage_reconnect);
        info!("  undervoltage disconnect  : {}", p.undervoltage_disconnect);
        info!("  undervoltage reconnect   : {}", p.undervoltage_reconnect);
        info!("  overcurrent disconnect   : {}", p.overcurrent_disconnect);
        info!("  overcurrent detection    : {} ms", p.overcurrent_detection_ms);
        info!("  overcurrent reconnect    : {} ms", p.overcurrent_reconnect_ms);
        info!("  short circuit disconnect : {}", p.short_circuit_disconnect);
        info!("  short circuit detection  : {} ms", p.short_circuit_detection_ms);
        info!("  short circuit reconnect  : {} ms", p.short_circuit_reconnect_ms);
        info!("  active low               : {}", p.active_low);
    }
}
