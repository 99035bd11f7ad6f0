use tracing_subscriber::{prelude::*, fmt, EnvFilter};

/// Initialize logging from the repeatable `-v` flag: level 1 logs
/// control decisions, level 2 additionally logs every raw pin write.
/// `RUST_LOG` overrides the flag when set.
pub fn init_logging(verbosity: usize) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    let filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => EnvFilter::new(level),
    };

    let fmt_layer = fmt::layer();

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .init();
}
