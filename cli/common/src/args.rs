//! Shared CLI arguments.

use clap::ValueEnum;
use tracing::Level;

/// Log verbosity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_str() {
        assert_eq!(LogLevel::from_str("warn", true).unwrap(), LogLevel::Warn);
        assert_eq!(Level::from(LogLevel::Debug), Level::DEBUG);
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }
}
