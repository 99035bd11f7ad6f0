use std::process::ExitCode;

use tokio::{
    select,
    signal::{
        ctrl_c,
        unix::{SignalKind, signal},
    },
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use tracing::{error, info};

use pifand::{
    arg_parser::ArgsOptions,
    config::{ControllerConfig, Mode, ReportMode},
    control::FanController,
    daemon,
    errors::PifandError,
    gpio::{FanPin, RppalFanPin},
    logger,
    sensor::{
        CpuTempSensor, SensorError, TEMP_INVALID_MILLIDEG,
        TemperatureSensor, format_millidegrees,
    },
};

fn main() -> ExitCode {
    let args = ArgsOptions::parse();

    // Daemon mode detaches from the terminal, verbose output would go
    // nowhere
    let verbosity = if args.daemon { 0 } else { args.verbose };
    logger::init_logging(verbosity);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::from(err.exit_code())
        }
    }
}

fn report(err: &PifandError) {
    if let PifandError::Usage(message) = err {
        eprintln!("{message}");
        eprintln!("run with --help for usage instructions");
        return;
    }

    error!("{err}");

    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        error!("caused by: {cause}");
        source = cause.source();
    }
}

fn run(args: ArgsOptions) -> Result<(), PifandError> {
    let config = ControllerConfig::from_args(&args)?;

    let mut pin = RppalFanPin::open(config.pin)?;

    match config.mode {
        Mode::Report(ReportMode::PinState) => {
            println!("{}", pin.get()? as u8);

            Ok(())
        }
        Mode::Report(ReportMode::Temperature) => {
            let mut sensor = CpuTempSensor::new();

            let milli = match sensor.read_millidegrees() {
                Ok(milli) => milli,
                // The one-shot caller surfaces a failed read as the
                // sentinel; only resolution failures are fatal here
                Err(SensorError::Read { .. }) => TEMP_INVALID_MILLIDEG,
                Err(err) => return Err(err.into()),
            };

            println!("{}", format_millidegrees(milli));

            Ok(())
        }
        Mode::Control(mode) => {
            if args.daemon {
                daemon::daemonize().map_err(PifandError::Daemonize)?;
            }

            // The control loop is strictly sequential, a current-thread
            // runtime is all it needs
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(PifandError::Runtime)?;

            let controller = FanController::new(
                pin,
                CpuTempSensor::new(),
                mode,
                config.frequency,
            );

            runtime.block_on(supervise(controller))
        }
    }
}

/// Run the controller under a task tracker, cancelling it on SIGINT or
/// SIGTERM and waiting for its teardown to finish.
async fn supervise<P, S>(
    controller: FanController<P, S>,
) -> Result<(), PifandError>
where
    P: FanPin + Send + 'static,
    S: TemperatureSensor + Send + 'static,
{
    let tracker = TaskTracker::new();
    let token = CancellationToken::new();

    let mut handle = tracker.spawn(controller.run(token.clone()));
    tracker.close();

    let mut sigterm =
        signal(SignalKind::terminate()).map_err(PifandError::Runtime)?;

    let joined = select! {
        res = &mut handle => res,
        _ = ctrl_c() => {
            info!("interrupt received, shutting down");
            token.cancel();
            (&mut handle).await
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received, shutting down");
            token.cancel();
            (&mut handle).await
        }
    };

    tracker.wait().await;

    joined.map_err(|_| PifandError::ControllerPanic)?
}
