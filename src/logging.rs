use std::fs;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Wires up tracing with a console layer and a daily-rolling JSON file layer.
/// Call once at process start, before any pipeline work.
pub fn init_logging() {
    let _ = fs::create_dir_all("logs");

    let file_appender = tracing_appender::rolling::daily("logs", "etl.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer().json().with_writer(file_writer);
    let console_layer = fmt::layer().with_writer(std::io::stdout);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("claims_etl=info".parse().unwrap()))
        .with(file_layer)
        .with(console_layer)
        .init();

    // The appender guard must outlive the process or buffered logs are lost
    std::mem::forget(guard);
}
