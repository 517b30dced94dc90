//! Tracing setup: daily-rolling log file plus stderr.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::ConfigError;

pub const LOG_FILE_NAME: &str = "emoji-reactor.log";

/// Dependencies that are chatty at `debug`.
const QUIET_TARGETS: &[&str] = &["hyper", "hyper_util", "reqwest", "rustls", "tungstenite"];

/// Install the global subscriber. Keep the returned guard alive for the
/// process lifetime or buffered file output is lost.
pub fn init_logging(level: &str, log_dir: &Path) -> Result<WorkerGuard, ConfigError> {
    std::fs::create_dir_all(log_dir)?;

    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .with_filter(env_filter(level)?);

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(env_filter(level)?);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|e| ConfigError::Logging(e.to_string()))?;

    tracing::info!(level, dir = %log_dir.display(), "Logging initialized");
    Ok(guard)
}

/// `RUST_LOG` wins when set; otherwise the configured level.
fn env_filter(level: &str) -> Result<EnvFilter, ConfigError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => level_filter(level),
    }
}

fn level_filter(level: &str) -> Result<EnvFilter, ConfigError> {
    let mut directives = vec![level.to_string()];
    directives.extend(QUIET_TARGETS.iter().map(|t| format!("{t}=warn")));

    EnvFilter::try_new(directives.join(",")).map_err(|e| ConfigError::InvalidValue {
        key: "LOG_LEVEL".into(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_filter_accepts_config_levels() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            let filter = level_filter(level).unwrap();
            assert!(filter.to_string().contains(level), "{level}");
        }
    }

    #[test]
    fn level_filter_quiets_dependencies() {
        let filter = level_filter("debug").unwrap().to_string();
        assert!(filter.contains("tungstenite=warn"));
        assert!(filter.contains("reqwest=warn"));
    }

    #[test]
    fn init_creates_log_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested").join("logs");

        let guard = init_logging("info", &dir).unwrap();

        assert!(dir.is_dir());
        drop(guard);
    }

    #[test]
    fn level_filter_rejects_garbage() {
        assert!(matches!(
            level_filter("info,reactor=notalevel"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
