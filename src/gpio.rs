use rppal::gpio::{Gpio, IoPin, Level, Mode};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum GpioError {
    #[error("unable to open the GPIO controller")]
    Open(#[source] rppal::gpio::Error),
    #[error("unable to configure pin {pin} as output")]
    Configure {
        pin: u8,
        #[source]
        source: rppal::gpio::Error,
    },
    #[error("unable to set the value of pin {pin}")]
    Set { pin: u8 },
    #[error("unable to get the value of pin {pin}")]
    Get { pin: u8 },
}

/// A single digital output line powering the fan.
///
/// The physical line is the only source of truth: `get` reads the line
/// back rather than returning a cached value. A write failure is a
/// safety fault and escalates to a fatal error at the top level.
pub trait FanPin {
    fn set(&mut self, value: bool) -> Result<(), GpioError>;
    fn get(&mut self) -> Result<bool, GpioError>;
}

/// Fan pin backed by the BCM GPIO controller via rppal.
pub struct RppalFanPin {
    pin: IoPin,
    number: u8,
}

impl RppalFanPin {
    /// Acquire the GPIO controller and configure the pin as output.
    pub fn open(number: u8) -> Result<Self, GpioError> {
        let gpio = Gpio::new().map_err(GpioError::Open)?;

        let pin = gpio.get(number).map_err(|source| GpioError::Configure {
            pin: number,
            source,
        })?;

        let mut pin = pin.into_io(Mode::Output);

        // Keep the last commanded level on teardown. A fan left running
        // after an abrupt termination is safe, a reset pulse is not.
        pin.set_reset_on_drop(false);

        Ok(Self { pin, number })
    }
}

impl FanPin for RppalFanPin {
    // Memory-mapped writes cannot fail once the pin is acquired, so the
    // Set/Get error variants are only produced by other backends.
    fn set(&mut self, value: bool) -> Result<(), GpioError> {
        debug!("PIN {} => {}", self.number, value as u8);

        let level = if value { Level::High } else { Level::Low };
        self.pin.write(level);

        Ok(())
    }

    fn get(&mut self) -> Result<bool, GpioError> {
        Ok(self.pin.read() == Level::High)
    }
}
