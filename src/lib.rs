pub mod arg_parser;
pub mod config;
pub mod control;
pub mod daemon;
pub mod errors;
pub mod gpio;
pub mod logger;
pub mod pwm;
pub mod sensor;

#[cfg(test)]
pub mod test_utils;
