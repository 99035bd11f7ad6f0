pub mod hysteresis;
pub mod thermostat;

use std::time::Duration;

use tokio::{select, time::sleep};
use tokio_util::sync::CancellationToken;

use tracing::{info, warn};

use crate::{
    config::ControlMode,
    control::{hysteresis::HysteresisBand, thermostat::ThermostatState},
    errors::PifandError,
    gpio::FanPin,
    pwm,
    sensor::{SensorError, TemperatureSensor},
};

/// Width of the temperature deadband in degrees Celsius, shared by the
/// hysteresis band and the thermostat sleep threshold.
pub const DEADBAND_C: f32 = 5.0;

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Drives one control strategy against a fan pin and a temperature
/// sensor until the cancellation token fires.
///
/// Cancellation is observed synchronously between ticks: the 1-second
/// sleeps abort immediately, a PWM pulse in flight finishes its period
/// first. Teardown runs exactly once when `run` returns; the pin handle
/// is released with the line left in its last commanded state.
pub struct FanController<P, S> {
    pin: P,
    sensor: S,
    mode: ControlMode,
    frequency: u32,
}

impl<P: FanPin, S: TemperatureSensor> FanController<P, S> {
    pub fn new(pin: P, sensor: S, mode: ControlMode, frequency: u32) -> Self {
        Self {
            pin,
            sensor,
            mode,
            frequency,
        }
    }

    pub async fn run(
        mut self,
        token: CancellationToken,
    ) -> Result<(), PifandError> {
        let result = match self.mode {
            ControlMode::FixedDuty(duty) => self.run_fixed(&token, duty).await,
            ControlMode::MaxTemp(max) => self.run_hysteresis(&token, max).await,
            ControlMode::PwmTarget(target) => {
                self.run_thermostat(&token, target).await
            }
        };

        info!("controller stopped");

        result
    }

    /// Fixed duty cycle. The boundary values are one-shot commands, any
    /// other duty pulses forever.
    async fn run_fixed(
        &mut self,
        token: &CancellationToken,
        duty: u8,
    ) -> Result<(), PifandError> {
        match duty {
            0 => {
                info!("turning fan off");
                self.pin.set(false)?;
            }
            100 => {
                info!("turning fan on");
                self.pin.set(true)?;
            }
            duty => {
                info!("running fan at {duty}%");

                while !token.is_cancelled() {
                    pwm::pulse(&mut self.pin, duty, self.frequency)?;

                    // The pulse blocks, give the signal driver a chance
                    // to run between periods
                    tokio::task::yield_now().await;
                }
            }
        }

        Ok(())
    }

    /// Two-point thermostat with a fixed deadband, one decision per
    /// second. A failed temperature read makes no decision this tick;
    /// a sensor that never resolves is fatal.
    async fn run_hysteresis(
        &mut self,
        token: &CancellationToken,
        max_temp: i32,
    ) -> Result<(), PifandError> {
        let band = HysteresisBand::new(max_temp as f32);

        info!(
            "keeping CPU temperature below {:.3} (fan off below {:.3})",
            band.high(),
            band.low()
        );

        loop {
            match self.sensor.read_millidegrees() {
                Ok(milli) => {
                    let temp = milli as f32 / 1000.0;
                    let fan_on = self.pin.get()?;

                    match band.decide(temp, fan_on) {
                        Some(true) => {
                            info!(
                                "CPU temperature {temp:.3} is above {:.3}, \
                                 turning fan ON",
                                band.high()
                            );
                            self.pin.set(true)?;
                        }
                        Some(false) => {
                            info!(
                                "CPU temperature {temp:.3} is below {:.3}, \
                                 turning fan OFF",
                                band.low()
                            );
                            self.pin.set(false)?;
                        }
                        None => {}
                    }
                }
                // No decision can ever be made without a resolved sensor
                Err(err @ SensorError::Resolve { .. }) => {
                    return Err(err.into());
                }
                Err(err) => {
                    warn!("temperature read failed, no decision this tick: {err}");
                }
            }

            select! {
                _ = token.cancelled() => break,
                _ = sleep(TICK_PERIOD) => {}
            }
        }

        Ok(())
    }

    /// PWM thermostat: pulse at the current duty cycle and ramp it ±1%
    /// once per accumulated 1-second window.
    async fn run_thermostat(
        &mut self,
        token: &CancellationToken,
        target_temp: i32,
    ) -> Result<(), PifandError> {
        let target = target_temp as f32;
        let mut state = ThermostatState::new();

        info!("keeping CPU temperature at {target_temp} C or below using PWM");

        while !token.is_cancelled() {
            if state.sleeping() {
                select! {
                    _ = token.cancelled() => break,
                    _ = sleep(TICK_PERIOD) => {}
                }
                state.fill_window();
            } else if state.duty() == 100 {
                // Avoid pulsing at full duty: hold the line high and
                // sleep the window out instead
                if !self.pin.get()? {
                    self.pin.set(true)?;
                }

                select! {
                    _ = token.cancelled() => break,
                    _ = sleep(TICK_PERIOD) => {}
                }
                state.fill_window();
            } else {
                let consumed =
                    pwm::pulse(&mut self.pin, state.duty(), self.frequency)?;
                state.consume(consumed);

                tokio::task::yield_now().await;
            }

            if state.window_complete() {
                self.evaluate_window(&mut state, target)?;
            }
        }

        Ok(())
    }

    /// One thermostat decision per completed window. A failed read keeps
    /// the duty and sleep state untouched; the window resets either way.
    /// A sensor that never resolves is fatal.
    fn evaluate_window(
        &mut self,
        state: &mut ThermostatState,
        target: f32,
    ) -> Result<(), PifandError> {
        match self.sensor.read_millidegrees() {
            Ok(milli) => {
                let temp = milli as f32 / 1000.0;

                match state.evaluate(temp, target) {
                    thermostat::ThermostatAction::EnterSleep => {
                        info!(
                            "temperature {temp:.3} is below {:.3}, \
                             entering sleep mode",
                            target - DEADBAND_C
                        );
                        self.pin.set(false)?;
                    }
                    thermostat::ThermostatAction::Wake => {
                        info!(
                            "temperature {temp:.3} is near target \
                             {target:.3}, waking up from sleep mode"
                        );
                    }
                    thermostat::ThermostatAction::Adjust(duty) => {
                        info!(
                            "temperature {temp:.3} for target \
                             {target:.3}, adjusting fan to {duty}%"
                        );
                    }
                    thermostat::ThermostatAction::Hold => {}
                }
            }
            Err(err @ SensorError::Resolve { .. }) => {
                return Err(err.into());
            }
            Err(err) => {
                warn!(
                    "temperature read failed, holding thermostat \
                     state: {err}"
                );
            }
        }

        state.reset_window();

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::test_utils::{FakePin, FakeSensor, UnresolvableSensor};

    fn controller(
        pin: FakePin,
        sensor: FakeSensor,
        mode: ControlMode,
    ) -> FanController<FakePin, FakeSensor> {
        FanController::new(pin, sensor, mode, 50)
    }

    #[tokio::test]
    async fn fixed_duty_zero_issues_exactly_one_set_low() {
        let pin = FakePin::new(true);
        let token = CancellationToken::new();
        let sensor = FakeSensor::new(std::iter::empty(), token.clone());

        controller(pin.clone(), sensor, ControlMode::FixedDuty(0))
            .run(token)
            .await
            .unwrap();

        assert_eq!(pin.writes(), vec![false]);
    }

    #[tokio::test]
    async fn fixed_duty_full_issues_exactly_one_set_high() {
        let pin = FakePin::new(false);
        let token = CancellationToken::new();
        let sensor = FakeSensor::new(std::iter::empty(), token.clone());

        controller(pin.clone(), sensor, ControlMode::FixedDuty(100))
            .run(token)
            .await
            .unwrap();

        assert_eq!(pin.writes(), vec![true]);
    }

    #[tokio::test]
    async fn fixed_duty_checks_cancellation_between_pulses() {
        let pin = FakePin::new(false);
        let token = CancellationToken::new();
        let sensor = FakeSensor::new(std::iter::empty(), token.clone());

        token.cancel();

        controller(pin.clone(), sensor, ControlMode::FixedDuty(40))
            .run(token)
            .await
            .unwrap();

        assert_eq!(pin.writes(), Vec::<bool>::new());
    }

    #[tokio::test(start_paused = true)]
    async fn hysteresis_follows_the_reference_sequence() {
        let pin = FakePin::new(false);
        let token = CancellationToken::new();
        let sensor = FakeSensor::new(
            [58_000, 61_000, 59_000, 56_000, 54_000],
            token.clone(),
        );

        controller(pin.clone(), sensor, ControlMode::MaxTemp(60))
            .run(token)
            .await
            .unwrap();

        assert_eq!(pin.writes(), vec![true, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn hysteresis_makes_no_decision_on_read_failure() {
        let pin = FakePin::new(false);
        let token = CancellationToken::new();
        // 61 turns the fan on, then the exhausted sensor fails a read
        // before the token is observed; the pin must not change again
        let sensor = FakeSensor::new([61_000], token.clone());

        controller(pin.clone(), sensor, ControlMode::MaxTemp(60))
            .run(token)
            .await
            .unwrap();

        assert_eq!(pin.writes(), vec![true]);
        assert!(pin.is_high());
    }

    #[tokio::test(start_paused = true)]
    async fn hysteresis_fails_fast_when_the_sensor_never_resolves() {
        let pin = FakePin::new(false);
        let token = CancellationToken::new();

        let err = FanController::new(
            pin.clone(),
            UnresolvableSensor,
            ControlMode::MaxTemp(60),
            50,
        )
        .run(token)
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            PifandError::Sensor(SensorError::Resolve { .. })
        ));
        assert_eq!(pin.writes(), Vec::<bool>::new());
    }

    #[tokio::test]
    async fn thermostat_fails_fast_when_the_sensor_never_resolves() {
        let pin = FakePin::new(false);
        let token = CancellationToken::new();

        let err = FanController::new(
            pin,
            UnresolvableSensor,
            ControlMode::PwmTarget(50),
            50,
        )
        .run(token)
        .await
        .unwrap_err();

        assert!(matches!(
            err,
            PifandError::Sensor(SensorError::Resolve { .. })
        ));
    }

    #[test]
    fn thermostat_read_failure_holds_duty_and_resets_the_window() {
        let pin = FakePin::new(false);
        let token = CancellationToken::new();
        let sensor = FakeSensor::scripted(
            [Some(60_000), None, Some(60_000)],
            token,
        );

        let mut controller =
            FanController::new(pin, sensor, ControlMode::PwmTarget(50), 50);
        let mut state = ThermostatState::new();

        state.fill_window();
        controller.evaluate_window(&mut state, 50.0).unwrap();
        assert_eq!(state.duty(), 51);

        // The failed reading holds the duty but still resets the window
        state.fill_window();
        controller.evaluate_window(&mut state, 50.0).unwrap();
        assert_eq!(state.duty(), 51);
        assert!(!state.sleeping());
        assert!(!state.window_complete());

        state.fill_window();
        controller.evaluate_window(&mut state, 50.0).unwrap();
        assert_eq!(state.duty(), 52);
    }

    #[tokio::test(start_paused = true)]
    async fn thermostat_commands_pin_off_when_entering_sleep() {
        let pin = FakePin::new(false);
        let token = CancellationToken::new();
        // Far below target-5: the first window evaluation enters sleep
        let sensor = FakeSensor::new([20_000], token.clone());

        controller(pin.clone(), sensor, ControlMode::PwmTarget(50))
            .run(token)
            .await
            .unwrap();

        // One second of pulses at 50% duty, then a single set low
        let writes = pin.writes();
        assert_eq!(writes.last(), Some(&false));
        assert!(!pin.is_high());
        assert!(writes.contains(&true));
    }
}
