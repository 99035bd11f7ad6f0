use std::io;

use thiserror::Error;

use crate::{config::ConfigError, gpio::GpioError, sensor::SensorError};

/// The main daemon error type.
///
/// Every fatal condition maps to a distinct exit code so operators and
/// scripts can distinguish the failure class.
#[derive(Debug, Error)]
pub enum PifandError {
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Sensor(#[from] SensorError),
    #[error(transparent)]
    Gpio(#[from] GpioError),
    #[error("unable to detach from the terminal")]
    Daemonize(#[source] io::Error),
    #[error("unable to start the async runtime")]
    Runtime(#[source] io::Error),
    #[error("the controller task terminated abnormally")]
    ControllerPanic,
}

impl PifandError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Usage(_) | Self::Config(_) => 1,
            Self::Sensor(_) => 2,
            Self::Gpio(GpioError::Open(_)) => 3,
            Self::Gpio(GpioError::Configure { .. }) => 4,
            Self::Gpio(GpioError::Set { .. } | GpioError::Get { .. }) => 5,
            Self::Daemonize(_) | Self::Runtime(_) | Self::ControllerPanic => 6,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_distinguish_failure_classes() {
        let codes = [
            PifandError::Usage(String::from("bad flags")).exit_code(),
            PifandError::Sensor(SensorError::Resolve {
                path: "/sys/class/thermal".into(),
                source: io::Error::from(io::ErrorKind::NotFound),
            })
            .exit_code(),
            PifandError::Gpio(GpioError::Set { pin: 14 }).exit_code(),
        ];

        assert_eq!(codes, [1, 2, 5]);
    }
}
