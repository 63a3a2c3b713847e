// src/logging.rs

//! Logging setup for `calcdag` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the filter:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `CALCDAG_LOG` environment variable, any `EnvFilter` directive
//!    (e.g. "debug" or "info,calcdag::scheduler=trace")
//! 3. default to `info`
//!
//! Logs are sent to STDERR so that stdout carries only expression results.

use anyhow::{Result, anyhow};
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

/// Environment variable holding the filter directives.
pub const LOG_ENV: &str = "CALCDAG_LOG";

const DEFAULT_DIRECTIVE: &str = "info";

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let env = std::env::var(LOG_ENV).ok();

    fmt()
        .with_env_filter(env_filter(cli_level, env.as_deref()))
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))
}

/// Build the filter from the CLI level or, failing that, the directives in
/// `env`. Directives that do not parse fall back to `info`.
pub fn env_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> EnvFilter {
    if let Some(lvl) = cli_level {
        return EnvFilter::new(directive(lvl));
    }
    env.and_then(|directives| EnvFilter::try_new(directives.trim()).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_DIRECTIVE))
}

fn directive(lvl: LogLevel) -> &'static str {
    match lvl {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_level_wins_over_environment() {
        let filter = env_filter(Some(LogLevel::Debug), Some("trace"));
        assert_eq!(filter.to_string(), "debug");
    }

    #[test]
    fn environment_accepts_per_target_directives() {
        let filter = env_filter(None, Some(" calcdag::scheduler=trace "));
        assert_eq!(filter.to_string(), "calcdag::scheduler=trace");
    }

    #[test]
    fn unparseable_or_missing_environment_defaults_to_info() {
        assert_eq!(env_filter(None, Some("calcdag=loud")).to_string(), "info");
        assert_eq!(env_filter(None, None).to_string(), "info");
    }
}
