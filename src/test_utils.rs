//! Hand-rolled hardware fakes shared by the unit tests.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use tokio_util::sync::CancellationToken;

use crate::{
    gpio::{FanPin, GpioError},
    sensor::{SensorError, TemperatureSensor},
};

#[derive(Debug, Default)]
struct PinLog {
    state: bool,
    writes: Vec<bool>,
}

/// In-memory fan pin recording every write. Clones share the same log so
/// a test can keep a handle while the controller owns the pin.
#[derive(Debug, Clone)]
pub struct FakePin {
    log: Arc<Mutex<PinLog>>,
}

impl FakePin {
    pub fn new(initial: bool) -> Self {
        Self {
            log: Arc::new(Mutex::new(PinLog {
                state: initial,
                writes: Vec::new(),
            })),
        }
    }

    pub fn writes(&self) -> Vec<bool> {
        self.log.lock().unwrap().writes.clone()
    }

    pub fn is_high(&self) -> bool {
        self.log.lock().unwrap().state
    }
}

impl FanPin for FakePin {
    fn set(&mut self, value: bool) -> Result<(), GpioError> {
        let mut log = self.log.lock().unwrap();
        log.state = value;
        log.writes.push(value);

        Ok(())
    }

    fn get(&mut self) -> Result<bool, GpioError> {
        Ok(self.log.lock().unwrap().state)
    }
}

/// Scripted temperature sensor. Yields the queued milli-degree readings
/// in order; a read past the end of the script cancels the given token
/// and reports a read error, so a driver loop processes every scripted
/// tick and then winds down.
pub struct FakeSensor {
    readings: VecDeque<Option<i32>>,
    token: CancellationToken,
}

impl FakeSensor {
    pub fn new(
        readings: impl IntoIterator<Item = i32>,
        token: CancellationToken,
    ) -> Self {
        Self::scripted(readings.into_iter().map(Some), token)
    }

    /// Like `new`, but `None` entries fail the read without ending the
    /// script.
    pub fn scripted(
        readings: impl IntoIterator<Item = Option<i32>>,
        token: CancellationToken,
    ) -> Self {
        Self {
            readings: readings.into_iter().collect(),
            token,
        }
    }

    fn read_error() -> SensorError {
        SensorError::Read {
            path: "fake".into(),
            source: std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "scripted reading failure",
            ),
        }
    }
}

impl TemperatureSensor for FakeSensor {
    fn read_millidegrees(&mut self) -> Result<i32, SensorError> {
        match self.readings.pop_front() {
            Some(Some(reading)) => Ok(reading),
            Some(None) => Err(Self::read_error()),
            None => {
                self.token.cancel();
                Err(Self::read_error())
            }
        }
    }
}

/// Sensor whose thermal zone never resolves.
pub struct UnresolvableSensor;

impl TemperatureSensor for UnresolvableSensor {
    fn read_millidegrees(&mut self) -> Result<i32, SensorError> {
        Err(SensorError::Resolve {
            path: "fake".into(),
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no thermal zones found",
            ),
        })
    }
}
