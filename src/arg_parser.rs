use std::{path::PathBuf, process};

use argparse::{ArgumentParser, IncrBy, Print, StoreOption, StoreTrue};

/// Raw command line options, validated into a `ControllerConfig` by the
/// configuration layer.
#[derive(Debug, Default)]
pub struct ArgsOptions {
    pub percentage: Option<i32>,
    pub max_temp: Option<i32>,
    pub pwm_target: Option<i32>,
    pub state: bool,
    pub cpu_temp: bool,

    pub pin: Option<i32>,
    pub frequency: Option<u32>,
    pub verbose: usize,
    pub daemon: bool,
    pub config_file: Option<PathBuf>,
}

impl ArgsOptions {
    pub fn parse() -> Self {
        let mut options = ArgsOptions::default();

        let result = {
            let mut parser = ArgumentParser::new();
            parser.set_description(
                "Control a CPU cooling fan on a GPIO pin, either as an \
                 on/off thermostat or with software PWM.",
            );

            parser.refer(&mut options.percentage).add_option(
                &["-p", "--percentage"],
                StoreOption,
                "Run the fan at a fixed duty-cycle percentage \
                 (0 turns it off, 100 turns it on)",
            );

            parser.refer(&mut options.max_temp).add_option(
                &["-t", "--max-temp"],
                StoreOption,
                "Keep the CPU temperature between MAX-5 and MAX degrees \
                 celsius",
            );

            parser.refer(&mut options.pwm_target).add_option(
                &["-w", "--pwm-temp"],
                StoreOption,
                "Keep the CPU temperature at the target degrees celsius \
                 using PWM",
            );

            parser.refer(&mut options.state).add_option(
                &["-s", "--state"],
                StoreTrue,
                "Print the fan pin state, 0 or 1",
            );

            parser.refer(&mut options.cpu_temp).add_option(
                &["-c", "--cpu-temp"],
                StoreTrue,
                "Print the CPU temperature",
            );

            parser.refer(&mut options.pin).add_option(
                &["-g", "--gpio-pin"],
                StoreOption,
                "GPIO pin driving the fan, 0 to 53 (default 14)",
            );

            parser.refer(&mut options.frequency).add_option(
                &["-f", "--frequency"],
                StoreOption,
                "PWM frequency in full on/off cycles per second, 1 to 50 \
                 (default 25)",
            );

            parser.refer(&mut options.verbose).add_option(
                &["-v", "--verbose"],
                IncrBy(1usize),
                "Increase verbosity, may be given twice",
            );

            parser.refer(&mut options.daemon).add_option(
                &["-d", "--daemon"],
                StoreTrue,
                "Detach from the terminal and run in the background",
            );

            parser.refer(&mut options.config_file).add_option(
                &["--config"],
                StoreOption,
                "Path of an optional JSON configuration file",
            );

            parser.add_option(
                &["-V", "--version"],
                Print(env!("CARGO_PKG_VERSION").to_string()),
                "Show the daemon version",
            );

            parser.parse_args()
        };

        match result {
            Ok(()) => options,
            // Help and version requests
            Err(0) => process::exit(0),
            // Usage errors share exit code 1 with the validation layer
            Err(_) => process::exit(1),
        }
    }
}
