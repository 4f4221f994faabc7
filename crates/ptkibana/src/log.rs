use crate::Result;
use std::fs;
use std::io;
use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

/// Logs always go to stderr, stdout is kept for the report.
pub fn init_tracing_subscriber(log_dir: Option<&Path>, filename: &str) -> Result<()> {
    // base for the subscriber
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_span_events(FmtSpan::CLOSE);

    match log_dir {
        Some(dir) => {
            ensure_dir(dir)?;
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::NEVER)
                .filename_prefix(filename)
                .filename_suffix("log")
                .build(dir)?;
            let subscriber = subscriber
                .with_ansi(false)
                .with_file(false)
                .with_target(false)
                .with_writer(file_appender)
                .finish();

            // add log in terminal as an additional layer
            let stderr_layer = layer()
                .with_span_events(FmtSpan::CLOSE)
                .with_ansi(true)
                .with_file(false)
                .with_target(false)
                .with_writer(io::stderr);

            tracing::subscriber::set_global_default(subscriber.with(stderr_layer))?;
        }
        None => {
            let subscriber = subscriber
                .with_ansi(true)
                .with_file(false)
                .with_target(false)
                .with_writer(io::stderr)
                .finish();

            tracing::subscriber::set_global_default(subscriber)?;
        }
    }

    Ok(())
}

pub fn ensure_dir(dir: &Path) -> Result<bool> {
    if dir.is_dir() {
        Ok(false)
    } else {
        fs::create_dir_all(dir)?;
        Ok(true)
    }
}
