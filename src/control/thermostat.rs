use crate::{control::DEADBAND_C, pwm::CONTROL_WINDOW_US};

/// Duty cycle the thermostat starts from before any evaluation.
pub const INITIAL_DUTY: u8 = 50;

/// What the controller must do after one thermostat evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThermostatAction {
    /// Large undershoot, stop pulsing entirely and command the pin off.
    EnterSleep,
    /// Back at target, resume pulsing at the retained duty cycle.
    Wake,
    /// Duty cycle ramped by one percent, pulsing continues.
    Adjust(u8),
    /// No change this window.
    Hold,
}

/// Mutable state of the PWM thermostat strategy.
///
/// The pulse timescale (set by the PWM frequency) is decoupled from the
/// control-decision timescale: duty adjustments happen once per
/// accumulated 1-second window regardless of how many pulses fit in it,
/// so sensor noise cannot make the duty cycle oscillate at pulse rate.
#[derive(Debug)]
pub struct ThermostatState {
    duty: u8,
    window_us: u64,
    sleeping: bool,
}

impl ThermostatState {
    pub fn new() -> Self {
        Self {
            duty: INITIAL_DUTY,
            window_us: 0,
            sleeping: false,
        }
    }

    pub fn duty(&self) -> u8 {
        self.duty
    }

    pub fn sleeping(&self) -> bool {
        self.sleeping
    }

    /// Account for the microseconds one pulse consumed.
    pub fn consume(&mut self, us: u64) {
        self.window_us += us;
    }

    /// Treat the current tick as a full measurement window. Used at 100%
    /// duty and in sleep mode, where no pulses accumulate time.
    pub fn fill_window(&mut self) {
        self.window_us = CONTROL_WINDOW_US;
    }

    pub fn window_complete(&self) -> bool {
        self.window_us >= CONTROL_WINDOW_US
    }

    pub fn reset_window(&mut self) {
        self.window_us = 0;
    }

    /// Evaluate one decision against the target, mutating duty and sleep
    /// mode. Ramps the duty by at most one percent per window so the
    /// controller converges instead of oscillating on sensor noise.
    pub fn evaluate(&mut self, temp_c: f32, target_c: f32) -> ThermostatAction {
        if temp_c < target_c - DEADBAND_C && !self.sleeping {
            self.sleeping = true;
            ThermostatAction::EnterSleep
        } else if temp_c >= target_c && self.sleeping {
            self.sleeping = false;
            ThermostatAction::Wake
        } else if !self.sleeping {
            let rounded = temp_c.round();

            if rounded > target_c && self.duty < 100 {
                self.duty += 1;
                ThermostatAction::Adjust(self.duty)
            } else if rounded < target_c && self.duty > 0 {
                self.duty -= 1;
                ThermostatAction::Adjust(self.duty)
            } else {
                ThermostatAction::Hold
            }
        } else {
            ThermostatAction::Hold
        }
    }
}
