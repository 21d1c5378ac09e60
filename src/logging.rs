use std::fs;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes tracing: human-readable console output plus a daily-rolling
/// JSON file under `logs/` for ingestion by log tooling. RUST_LOG overrides
/// the default `govoptima=info` filter.
pub fn init_logging() {
    let _ = fs::create_dir_all("logs");

    let file_appender = tracing_appender::rolling::daily("logs", "govoptima.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("govoptima=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().with_writer(file_writer))
        .with(fmt::layer().with_writer(std::io::stdout))
        .init();

    // The writer guard must outlive the process so buffered logs flush
    std::mem::forget(guard);
}
