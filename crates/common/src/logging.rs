//! Logging and tracing initialization.

use std::fs::{File, OpenOptions};
use std::sync::Mutex;

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Build the level filter for a logging config.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn resolve_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
}

/// Open the configured log file for appending, if any.
pub fn open_log_file(config: &LoggingConfig) -> Option<File> {
    let path = config.file.as_ref()?;
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("handwave: cannot open log file {}: {e}", path.display());
            None
        }
    }
}

/// Initialize the tracing subscriber with the given configuration.
///
/// When `config.file` is set and can be opened for appending, log lines go
/// there instead of stderr. Calling this twice is harmless; the second
/// subscriber is discarded.
pub fn init_logging(config: &LoggingConfig) {
    let builder = fmt::Subscriber::builder()
        .with_env_filter(resolve_filter(config))
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    match (open_log_file(config), config.json) {
        (Some(file), true) => {
            let subscriber = builder
                .json()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber).ok();
        }
        (Some(file), false) => {
            let subscriber = builder
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber).ok();
        }
        (None, true) => {
            let subscriber = builder.json().finish();
            tracing::subscriber::set_global_default(subscriber).ok();
        }
        (None, false) => {
            let subscriber = builder.finish();
            tracing::subscriber::set_global_default(subscriber).ok();
        }
    }
}

/// The configured logging, raised to `debug` by a CLI `--verbose` switch.
pub fn cli_logging(config: &LoggingConfig, verbose: bool) -> LoggingConfig {
    let mut config = config.clone();
    if verbose {
        config.level = "debug".to_string();
    }
    config
}
