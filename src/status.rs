//! Packed status words for the register-mapped reporting layer.
//!
//! Each word is a plain struct of named booleans with an explicit
//! `bits()` / `from_bits()` pair.  The bit positions are the wire contract
//! with the external protocol layer, which copies the words verbatim into
//! its input-register block.
//!
//! | Word             | Bits                                                   |
//! |------------------|--------------------------------------------------------|
//! | `FaultFlags`     | 0 undervoltage, 1 overvoltage, 2 overcurrent, 3 short  |
//! | `FeedbackStatus` | 0–2 MCB present, 3–5 relay feedback, 6–11 ON/OFF failed|
//! | `SystemStatus`   | 0 run, 1 manual mode                                   |

use crate::CHANNEL_COUNT;

// ---------------------------------------------------------------------------
// Per-channel protection faults
// ---------------------------------------------------------------------------

/// Sticky protection faults of one channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaultFlags {
    pub undervoltage: bool,
    pub overvoltage: bool,
    pub overcurrent: bool,
    pub short_circuit: bool,
}

impl FaultFlags {
    const UNDERVOLTAGE: u16 = 1 << 0;
    const OVERVOLTAGE: u16 = 1 << 1;
    const OVERCURRENT: u16 = 1 << 2;
    const SHORT_CIRCUIT: u16 = 1 << 3;

    /// True if any fault is latched.
    pub fn any(&self) -> bool {
        self.undervoltage || self.overvoltage || self.overcurrent || self.short_circuit
    }

    pub fn bits(&self) -> u16 {
        let mut bits = 0;
        if self.undervoltage {
            bits |= Self::UNDERVOLTAGE;
        }
        if self.overvoltage {
            bits |= Self::OVERVOLTAGE;
        }
        if self.overcurrent {
            bits |= Self::OVERCURRENT;
        }
        if self.short_circuit {
            bits |= Self::SHORT_CIRCUIT;
        }
        bits
    }

    /// Unused high bits are ignored.
    pub fn from_bits(bits: u16) -> Self {
        Self {
            undervoltage: bits & Self::UNDERVOLTAGE != 0,
            overvoltage: bits & Self::OVERVOLTAGE != 0,
            overcurrent: bits & Self::OVERCURRENT != 0,
            short_circuit: bits & Self::SHORT_CIRCUIT != 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Board-wide feedback word
// ---------------------------------------------------------------------------

/// Per-channel inputs to the feedback word.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelFeedback {
    /// Breaker upstream of the relay is closed (load voltage present).
    pub mcb_present: bool,
    /// Debounced relay position contact.
    pub relay_closed: bool,
    /// Relay ON retries exhausted.
    pub on_failed: bool,
    /// Relay OFF retries exhausted.
    pub off_failed: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedbackStatus {
    pub channels: [ChannelFeedback; CHANNEL_COUNT],
}

impl FeedbackStatus {
    pub fn bits(&self) -> u16 {
        let mut bits = 0u16;
        for (i, ch) in self.channels.iter().enumerate() {
            if ch.mcb_present {
                bits |= 1 << i;
            }
            if ch.relay_closed {
                bits |= 1 << (CHANNEL_COUNT + i);
            }
            if ch.on_failed {
                bits |= 1 << (2 * CHANNEL_COUNT + 2 * i);
            }
            if ch.off_failed {
                bits |= 1 << (2 * CHANNEL_COUNT + 2 * i + 1);
            }
        }
        bits
    }

    pub fn from_bits(bits: u16) -> Self {
        let mut status = Self::default();
        for (i, ch) in status.channels.iter_mut().enumerate() {
            ch.mcb_present = bits & (1 << i) != 0;
            ch.relay_closed = bits & (1 << (CHANNEL_COUNT + i)) != 0;
            ch.on_failed = bits & (1 << (2 * CHANNEL_COUNT + 2 * i)) != 0;
            ch.off_failed = bits & (1 << (2 * CHANNEL_COUNT + 2 * i + 1)) != 0;
        }
        status
    }
}

// ---------------------------------------------------------------------------
// System word
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SystemStatus {
    pub run: bool,
    pub manual: bool,
}

impl SystemStatus {
    pub fn bits(&self) -> u16 {
        u16::from(self.run) | (u16::from(self.manual) << 1)
    }

    pub fn from_bits(bits: u16) -> Self {
        Self {
            run: bits & 0b01 != 0,
            manual: bits & 0b10 != 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Number of words in the input-register block.
pub const INPUT_REGISTER_COUNT: usize = 12;

/// Everything the reporting layer needs after one control cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusSnapshot {
    /// Load voltage per channel (0.1 V).
    pub voltage: [i16; CHANNEL_COUNT],
    /// Bus voltage (0.1 V).
    pub system_voltage: i16,
    /// Signed load current per channel (0.01 A).
    pub current: [i16; CHANNEL_COUNT],
    pub faults: [FaultFlags; CHANNEL_COUNT],
    pub feedback: FeedbackStatus,
    pub system: SystemStatus,
}

impl StatusSnapshot {
    /// Flatten into the input-register layout: voltages, system voltage,
    /// currents, fault words, feedback word, system word.
    pub fn input_registers(&self) -> [u16; INPUT_REGISTER_COUNT] {
        let mut regs = [0u16; INPUT_REGISTER_COUNT];
        for i in 0..CHANNEL_COUNT {
            regs[i] = self.voltage[i] as u16;
            regs[CHANNEL_COUNT + 1 + i] = self.current[i] as u16;
            regs[2 * CHANNEL_COUNT + 1 + i] = self.faults[i].bits();
        }
        regs[CHANNEL_COUNT] = self.system_voltage as u16;
        regs[3 * CHANNEL_COUNT + 1] = self.feedback.bits();
        regs[3 * CHANNEL_COUNT + 2] = self.system.bits();
        regs
    }
}
