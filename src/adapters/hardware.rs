//! Board adapter: bridges the real ADC and feedback contacts to the
//! domain port traits.
//!
//! This is the only adapter that reads hardware on the control path.  On
//! non-espidf targets the underlying `hw_init` helpers are simulation
//! stubs (ADC reads 0, pulled-up inputs read high).

use embedded_hal::digital::InputPin;
use log::warn;

use crate::CHANNEL_COUNT;
use crate::app::ports::{FeedbackPort, SamplePort};
use crate::config::SystemConfig;
use crate::drivers::feedback::{FeedbackEdge, FeedbackInput};
use crate::drivers::hw_init;
use crate::pins;
use crate::sensors::current::{CurrentSenseCalibration, adc_span_to_millivolts};
use crate::sensors::{ChannelSample, SampleFrame};

/// Concrete adapter for the three-channel load board.
pub struct BoardAdapter<I> {
    feedback_pins: [I; CHANNEL_COUNT],
    feedback: [FeedbackInput; CHANNEL_COUNT],
    calibration: [CurrentSenseCalibration; CHANNEL_COUNT],
    voltage_divisor: u16,
}

impl<I: InputPin> BoardAdapter<I> {
    pub fn new(config: &SystemConfig, feedback_pins: [I; CHANNEL_COUNT]) -> Self {
        let input = || {
            FeedbackInput::new(true, config.feedback_debounce_ms, config.feedback_press_ms)
        };
        Self {
            feedback_pins,
            feedback: core::array::from_fn(|_| input()),
            calibration: config.current_sense,
            voltage_divisor: config.voltage_adc_divisor.max(1),
        }
    }

    fn read_current(&self, channel: usize) -> i32 {
        let raw = hw_init::adc1_read(pins::CURRENT_ADC_CHANNEL[channel]);
        let mv = adc_span_to_millivolts(raw, 0, pins::ADC_MAX_RAW, pins::ADC_FULL_SCALE_MV);
        self.calibration[channel].to_centiamps(mv)
    }
}

// ── SamplePort implementation ─────────────────────────────────

impl<I: InputPin> SamplePort for BoardAdapter<I> {
    fn read_samples(&mut self) -> SampleFrame {
        // One bus-voltage divider feeds every channel.
        let raw = hw_init::adc1_read(pins::VOLTAGE_ADC_CHANNEL);
        let voltage = i32::from(raw / self.voltage_divisor);

        let mut frame = SampleFrame {
            system_voltage: voltage,
            ..SampleFrame::default()
        };
        for (i, sample) in frame.channels.iter_mut().enumerate() {
            *sample = ChannelSample {
                voltage,
                current: self.read_current(i),
            };
        }
        frame
    }
}

// ── FeedbackPort implementation ───────────────────────────────

impl<I: InputPin> FeedbackPort for BoardAdapter<I> {
    fn read_feedback(&mut self, now_ms: u64) -> [bool; CHANNEL_COUNT] {
        let mut closed = [false; CHANNEL_COUNT];
        for (i, (pin, input)) in self
            .feedback_pins
            .iter_mut()
            .zip(self.feedback.iter_mut())
            .enumerate()
        {
            let level = match pin.is_high() {
                Ok(level) => level,
                Err(e) => {
                    warn!("relay {} feedback read failed: {:?}", i + 1, e);
                    closed[i] = input.is_closed();
                    continue;
                }
            };
            match input.tick(now_ms, level) {
                Some(FeedbackEdge::Closed) => log::debug!("relay {} closed", i + 1),
                Some(FeedbackEdge::Opened) => log::debug!("relay {} opened", i + 1),
                None => {}
            }
            closed[i] = input.is_closed();
        }
        closed
    }
}
