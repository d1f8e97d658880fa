//! Global `tracing` subscriber setup

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Subscriber setup failure
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// Log file could not be opened for append
    #[error("failed to open log file {}: {source}", path.display())]
    Io {
        /// Log file
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },
    /// A global subscriber is already installed
    #[error("failed to install subscriber: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Subscriber options
#[derive(Clone, Debug, Default)]
pub struct LogOptions<'a> {
    /// Default to `debug` instead of `info` when `RUST_LOG` is unset
    pub debug: bool,
    /// Append to this file instead of writing to stderr
    pub log_file: Option<&'a Path>,
}

/// Install the global subscriber. `RUST_LOG` takes precedence over `debug`.
pub fn init(options: &LogOptions<'_>) -> Result<(), LoggingError> {
    let default_level = if options.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    match options.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|source| LoggingError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(Mutex::new(file))
                        .with_ansi(false),
                )
                .try_init()?;
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .try_init()?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwritable_log_file_is_reported() {
        let options = LogOptions {
            debug: true,
            log_file: Some(Path::new("/nonexistent/dir/running.log")),
        };

        assert!(matches!(init(&options), Err(LoggingError::Io { .. })));
    }
}
