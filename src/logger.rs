//! Logger setup for the command line tools

use std::path::Path;

use colored::{ColoredString, Colorize};
use log::info;
use thiserror::Error;

pub use log::LevelFilter;

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Error initialising the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("An error occured while setting up the logger: {0}")]
    FernInitError(log::SetLoggerError),
}

/// Initialise the logger for this execution.
///
/// Records go to stdout and, when `log_file` is given, to that file too.
/// Must only be called once per process.
pub fn logger_init(min_level: LevelFilter, log_file: Option<&Path>) -> Result<(), LoggerInitError> {
    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            let stamp = chrono::Local::now().format("%H:%M:%S%.3f");

            // Debug and trace records carry their target
            if record.level() > log::Level::Info {
                out.finish(format_args!(
                    "[{} {}] {}: {}",
                    stamp,
                    level_to_str(record.level()),
                    record.target(),
                    message
                ))
            } else {
                out.finish(format_args!("[{} {}] {}", stamp, level_to_str(record.level()), message))
            }
        })
        .level(min_level)
        .chain(std::io::stdout());

    if let Some(path) = log_file {
        let file = fern::log_file(path).map_err(LoggerInitError::LogFileInitError)?;
        dispatch = dispatch.chain(file);
    }

    dispatch.apply().map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised");
    info!("    Log level: {:?}", min_level);
    if let Some(path) = log_file {
        info!("    Log file path: {:?}", path);
    }

    Ok(())
}

/// Get the string representation of a log level
fn level_to_str(level: log::Level) -> ColoredString {
    match level {
        log::Level::Trace => "TRC".dimmed().italic(),
        log::Level::Debug => "DBG".dimmed(),
        log::Level::Info => "INF".normal(),
        log::Level::Warn => "WRN".yellow(),
        log::Level::Error => "ERR".red().bold(),
    }
}
