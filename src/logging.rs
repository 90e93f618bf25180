//! Tracing subscriber setup for binaries and demos embedding the engine.

use crate::config::LoggingConfig;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// File name prefix of rotated log files.
pub const LOG_FILE_PREFIX: &str = "scanward.log";

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over `config.level`. When
/// `config.directory` is set, events are also written to a daily-rotated
/// file there; the returned guard must be kept alive to flush it.
///
/// Calling this more than once is harmless: later calls leave the first
/// subscriber in place.
pub fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = match &config.directory {
        Some(dir) => match std::fs::create_dir_all(dir) {
            Ok(()) => {
                let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);
                let layer = fmt::layer()
                    .with_writer(non_blocking)
                    .with_ansi(false)
                    .with_target(true)
                    .with_thread_ids(true);
                (Some(layer), Some(guard))
            }
            Err(e) => {
                eprintln!("scanward: cannot create log directory {}: {e}", dir.display());
                (None, None)
            }
        },
        None => (None, None),
    };

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(file_layer)
        .try_init();

    if result.is_ok() {
        tracing::debug!(level = %config.level, file = config.directory.is_some(), "Logging initialized");
    }
    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            level: "debug".to_string(),
            directory: Some(dir.path().join("logs")),
        };
        let guard = init_logging(&config);
        assert!(guard.is_some());
        assert!(dir.path().join("logs").is_dir());

        let _second = init_logging(&LoggingConfig::default());
    }
}
