//! Tracing subscriber initialization: a stdout layer (pretty or JSON) and
//! an optional daily-rotating JSON file layer, both filtered by the same
//! `EnvFilter`.

use anyhow::Result;
use std::io;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::domain::models::config::LoggingConfig;

/// Holds the non-blocking writer's flush guard for the life of the process.
pub struct LoggerGuard {
    _guard: Option<WorkerGuard>,
}

impl LoggerGuard {
    /// Initialize the global tracing subscriber from `config`.
    ///
    /// With `log_dir` set, writes daily-rotating JSON to disk; stdout gets
    /// its own layer in whichever format the config requests. Without
    /// `log_dir`, stdout is the only sink.
    pub fn init(config: &LoggingConfig) -> Result<Self> {
        let default_level = parse_log_level(&config.level)?;
        let env_filter = EnvFilter::builder().with_default_directive(default_level.into()).from_env_lossy();

        let guard = if let Some(ref log_dir) = config.log_dir {
            let file_appender = rolling::daily(log_dir, "piv-supervisor.log");
            let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

            let file_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking_file)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true);

            if config.format == "pretty" {
                let stdout_layer = tracing_subscriber::fmt::layer().pretty().with_writer(io::stdout).with_target(true);
                tracing_subscriber::registry().with(env_filter).with(file_layer).with(stdout_layer).init();
            } else {
                let stdout_layer = tracing_subscriber::fmt::layer().json().with_writer(io::stdout).with_target(true);
                tracing_subscriber::registry().with(env_filter).with(file_layer).with(stdout_layer).init();
            }

            Some(guard)
        } else if config.format == "pretty" {
            let stdout_layer = tracing_subscriber::fmt::layer().pretty().with_writer(io::stdout).with_target(true);
            tracing_subscriber::registry().with(env_filter).with(stdout_layer).init();
            None
        } else {
            let stdout_layer = tracing_subscriber::fmt::layer().json().with_writer(io::stdout).with_target(true);
            tracing_subscriber::registry().with(env_filter).with(stdout_layer).init();
            None
        };

        tracing::info!(level = %config.level, format = %config.format, file_output = config.log_dir.is_some(), "logger initialized");

        Ok(Self { _guard: guard })
    }
}

fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!("invalid log level: {level}"),
    }
}
