use crate::control::DEADBAND_C;

/// Two-point thermostat band: fan on above `high`, off below
/// `high - DEADBAND_C`, no change inside the band.
#[derive(Debug, Clone, Copy)]
pub struct HysteresisBand {
    high: f32,
    low: f32,
}

impl HysteresisBand {
    pub fn new(max_temp_c: f32) -> Self {
        Self {
            high: max_temp_c,
            low: max_temp_c - DEADBAND_C,
        }
    }

    pub fn high(&self) -> f32 {
        self.high
    }

    pub fn low(&self) -> f32 {
        self.low
    }

    /// Decide the next pin command for one tick, `None` meaning no
    /// change. The band between the thresholds is what prevents
    /// on/off chattering around the target.
    pub fn decide(&self, temp_c: f32, fan_on: bool) -> Option<bool> {
        if temp_c > self.high && !fan_on {
            Some(true)
        } else if temp_c < self.low && fan_on {
            Some(false)
        } else {
            None
        }
    }
}
