use std::{thread, time::Duration};

use crate::gpio::{FanPin, GpioError};

/// One control-decision window in microseconds.
pub const CONTROL_WINDOW_US: u64 = 1_000_000;

/// High and low durations in microseconds for one PWM period.
///
/// Integer arithmetic on purpose: one percent of duty corresponds to
/// `10000 / frequency` microseconds, so the period is `100` of those
/// units rather than exactly `1_000_000 / frequency` when the division
/// truncates.
pub fn pulse_durations(duty: u8, frequency: u32) -> (u64, u64) {
    let unit = 10_000 / u64::from(frequency);

    (u64::from(duty) * unit, (100 - u64::from(duty)) * unit)
}

/// Drive the pin through one on/off PWM period at the given duty cycle.
///
/// This is a blocking primitive: the precise intra-period timing is what
/// produces the perceived duty cycle on the fan motor, so it sleeps the
/// control thread rather than yielding to the runtime. Returns the total
/// microseconds consumed.
///
/// A duty of 0 never asserts the line; a duty of 100 never de-asserts it
/// at the end of the period. Frequency bounds [1,50] are a caller
/// enforced precondition.
pub fn pulse<P: FanPin>(
    pin: &mut P,
    duty: u8,
    frequency: u32,
) -> Result<u64, GpioError> {
    let (high_us, low_us) = pulse_durations(duty, frequency);

    if high_us > 0 {
        pin.set(true)?;
        thread::sleep(Duration::from_micros(high_us));
    }

    if low_us > 0 {
        pin.set(false)?;
        thread::sleep(Duration::from_micros(low_us));
    }

    Ok(high_us + low_us)
}
