use std::env;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Set up tracing with a pretty stdout layer and a plain-text file layer.
/// The returned guard flushes the file writer on drop; keep it alive for
/// the life of the process.
pub fn init_logger() -> impl Drop {
    // `TRACING_LEVEL` takes an EnvFilter directive string; `LOG_FILE_PATH`
    // relocates the log file.
    let filter = env::var("TRACING_LEVEL").unwrap_or_else(|_| "info".to_string());
    let log_file_path =
        env::var("LOG_FILE_PATH").unwrap_or_else(|_| "./logs/fitsdex.log".to_string());

    let file_appender = tracing_appender::rolling::never("./", log_file_path);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_file(false)
        .pretty()
        .without_time()
        .with_ansi(true);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .with(EnvFilter::new(filter))
        .init();

    info!("Tracing is configured for stdout and file logging.");

    guard
}
