use anyhow::Result;
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};

fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize logging from configuration
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(config.level.as_str()))
        .with_target(config.with_target);

    // Use try_init to avoid panic if global subscriber already set
    let result = match config.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if result.is_err() {
        tracing::debug!("Global tracing subscriber already initialized, skipping");
    }

    Ok(())
}

/// Initialize simple tracing for basic console output
pub fn init_simple_tracing(log_level: &str) -> Result<()> {
    if tracing_subscriber::fmt()
        .with_env_filter(env_filter(log_level))
        .try_init()
        .is_err()
    {
        tracing::debug!("Global tracing subscriber already initialized, skipping");
    }

    Ok(())
}

/// Initialize tracing that writes through the test harness capture.
///
/// Safe to call from every test; only the first call installs a subscriber.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter("debug"))
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogLevel;

    #[test]
    fn test_repeated_init_does_not_fail() {
        init_test_tracing();
        assert!(init_simple_tracing("info").is_ok());
        let config = LoggingConfig {
            level: LogLevel::Warn,
            format: LogFormat::Json,
            with_target: true,
        };
        assert!(init_logging(&config).is_ok());
    }
}
