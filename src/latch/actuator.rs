//! Self-contained latch actuator: owns and drives its coil generators.

use embedded_hal::digital::OutputPin;

use super::{Latch, LatchCore, PulsePair, RetryPolicy};

pub struct LatchActuator<P> {
    core: LatchCore,
    pulses: PulsePair<P>,
}

impl<P: OutputPin> LatchActuator<P> {
    pub fn new(channel: u8, policy: RetryPolicy, pulses: PulsePair<P>) -> Self {
        Self {
            core: LatchCore::new(channel, policy),
            pulses,
        }
    }

    pub fn pulses(&self) -> &PulsePair<P> {
        &self.pulses
    }

    pub fn pulses_mut(&mut self) -> &mut PulsePair<P> {
        &mut self.pulses
    }
}

impl<P: OutputPin> Latch for LatchActuator<P> {
    fn core(&self) -> &LatchCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut LatchCore {
        &mut self.core
    }

    fn handle(&mut self, now_ms: u64, action: bool, feedback: bool) {
        // In-flight pulses advance in every mode.
        self.pulses.tick(now_ms);
        self.core.step(now_ms, action, feedback, &mut self.pulses);
    }

    fn release_outputs(&mut self) {
        self.pulses.release();
    }
}
