//! Logging setup using `tracing` and `tracing-subscriber`.
//!
//! Logs go to stderr so stdout only carries the resulting path.
//! `RUST_LOG` overrides the level chosen from `-v` flags.

use clap::ValueEnum;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable multi-field output.
    #[default]
    Pretty,
    /// Single-line output.
    Compact,
    /// One JSON object per event.
    Json,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: Level,
    pub format: LogFormat,
}

impl LogConfig {
    /// - 0 (no `-v`): warn
    /// - 1 (`-v`): info
    /// - 2 (`-vv`): debug
    /// - 3+: trace
    #[must_use]
    pub fn from_verbosity(verbosity: u8, format: LogFormat) -> Self {
        let level = match verbosity {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };
        Self { level, format }
    }
}

/// Install the global subscriber. Call once at startup.
pub fn init_logging(config: &LogConfig) {
    let filter = build_env_filter(config.level);
    let layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    match config.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .init(),
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(layer.compact().without_time())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(layer.pretty().without_time())
            .init(),
    }
}

fn build_env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = level.as_str().to_lowercase();
        EnvFilter::new(format!(
            "warn,profile_entitlements={level},profile_entitlements_cli={level}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_verbosity() {
        assert_eq!(LogConfig::from_verbosity(0, LogFormat::Pretty).level, Level::WARN);
        assert_eq!(LogConfig::from_verbosity(1, LogFormat::Pretty).level, Level::INFO);
        assert_eq!(LogConfig::from_verbosity(2, LogFormat::Json).level, Level::DEBUG);
        assert_eq!(LogConfig::from_verbosity(9, LogFormat::Compact).level, Level::TRACE);
    }

    #[test]
    fn test_init_pretty_logging() {
        init_logging(&LogConfig::from_verbosity(1, LogFormat::Pretty));
        tracing::info!(path = "MyApp.app-entitlements", "pretty subscriber installed");
        assert!(tracing::dispatcher::has_been_set());
    }
}
