use std::fs::{self, OpenOptions};
use std::sync::Mutex;

use snafu::{ResultExt, Snafu};
use supports_color::Stream;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;

use crate::application::RuntimeConfig;
use crate::ext::BestEffortPathExt;

/// Sends every record both to stdout and to the configured log file.
///
/// Does nothing when the log level is `silent`.
pub fn setup_tracing(config: &RuntimeConfig) -> Result<(), LoggingError> {
    let Some(level) = config.log_level.to_tracing_level() else {
        return Ok(());
    };
    let filter = LevelFilter::from_level(level);

    if let Some(parent) = config.log_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context(OpenLogFileSnafu {
            file_path: config.log_file.best_effort_path_display(),
        })?;
    }
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)
        .context(OpenLogFileSnafu {
            file_path: config.log_file.best_effort_path_display(),
        })?;

    let console_layer = tracing_subscriber::fmt::layer()
        .with_ansi(supports_color::on(Stream::Stdout).is_some())
        .with_target(false)
        .compact()
        .with_filter(filter);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(log_file))
        .with_filter(filter);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context(InitSnafu)
}

#[derive(Debug, Snafu)]
pub enum LoggingError {
    #[snafu(display("Failed to open the log file: {}", file_path))]
    OpenLogFileError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Failed to install the log subscriber"))]
    InitError { source: TryInitError },
}
