use std::{
    fs::File,
    io::{self, BufReader},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{arg_parser::ArgsOptions, errors::PifandError};

pub const DEFAULT_GPIO_PIN: u8 = 14;
pub const DEFAULT_PWM_FREQ: u32 = 25;

pub const GPIO_PIN_MAX: u8 = 53;
pub const PWM_FREQ_RANGE: std::ops::RangeInclusive<u32> = 1..=50;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read configuration file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed configuration file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Continuous control strategies, selected by exactly one CLI mode flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    /// Run the fan at a fixed duty-cycle percentage in (0,100); 0 and
    /// 100 are one-shot off/on commands.
    FixedDuty(u8),
    /// Keep the temperature between `max - 5` and `max` degrees Celsius.
    MaxTemp(i32),
    /// Keep the temperature at the target degrees Celsius using PWM.
    PwmTarget(i32),
}

/// One-shot report modes printing a single line to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportMode {
    PinState,
    Temperature,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Control(ControlMode),
    Report(ReportMode),
}

/// Validated startup configuration, read once and never mutated.
#[derive(Debug)]
pub struct ControllerConfig {
    pub pin: u8,
    pub frequency: u32,
    pub verbosity: usize,
    pub mode: Mode,
}

/// Optional JSON file supplying defaults for the pin and frequency;
/// explicit command line flags always win.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FileConfig {
    pub pin: Option<u8>,
    pub frequency: Option<u32>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_reader(BufReader::new(file)).map_err(|source| {
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })
    }
}

impl ControllerConfig {
    /// Merge the parsed arguments with the optional configuration file
    /// and validate the result.
    pub fn from_args(args: &ArgsOptions) -> Result<Self, PifandError> {
        let file = match &args.config_file {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };

        let mode = select_mode(args)?;

        // The file value goes through the same range check as the flag
        let pin = args
            .pin
            .or(file.pin.map(i32::from))
            .map_or(Ok(DEFAULT_GPIO_PIN), validate_pin)?;

        let frequency = args
            .frequency
            .or(file.frequency)
            .unwrap_or(DEFAULT_PWM_FREQ);

        if !PWM_FREQ_RANGE.contains(&frequency) {
            return Err(usage(format!(
                "PWM frequency must be between {} and {}, got {frequency}",
                PWM_FREQ_RANGE.start(),
                PWM_FREQ_RANGE.end()
            )));
        }

        Ok(Self {
            pin,
            frequency,
            verbosity: args.verbose,
            mode,
        })
    }
}

fn usage(message: String) -> PifandError {
    PifandError::Usage(message)
}

fn validate_pin(pin: i32) -> Result<u8, PifandError> {
    if (0..=i32::from(GPIO_PIN_MAX)).contains(&pin) {
        Ok(pin as u8)
    } else {
        Err(usage(format!(
            "GPIO pin must be between 0 and {GPIO_PIN_MAX}, got {pin}"
        )))
    }
}

// Exactly one primary mode must be selected
fn select_mode(args: &ArgsOptions) -> Result<Mode, PifandError> {
    let selected = usize::from(args.percentage.is_some())
        + usize::from(args.max_temp.is_some())
        + usize::from(args.pwm_target.is_some())
        + usize::from(args.state)
        + usize::from(args.cpu_temp);

    if selected != 1 {
        return Err(usage(String::from(
            "exactly one of -p, -t, -w, -s or -c must be given",
        )));
    }

    if let Some(percentage) = args.percentage {
        if !(0..=100).contains(&percentage) {
            return Err(usage(format!(
                "duty-cycle percentage must be between 0 and 100, \
                 got {percentage}"
            )));
        }

        Ok(Mode::Control(ControlMode::FixedDuty(percentage as u8)))
    } else if let Some(max_temp) = args.max_temp {
        Ok(Mode::Control(ControlMode::MaxTemp(max_temp)))
    } else if let Some(target) = args.pwm_target {
        Ok(Mode::Control(ControlMode::PwmTarget(target)))
    } else if args.state {
        Ok(Mode::Report(ReportMode::PinState))
    } else {
        Ok(Mode::Report(ReportMode::Temperature))
    }
}
