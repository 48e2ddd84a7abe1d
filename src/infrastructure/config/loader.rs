//! Hierarchical configuration loading: figment merges defaults, then the
//! on-disk YAML files, then environment overrides, in that order.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::models::Config;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("invalid monitor_interval_ms: {0}. Must be positive")]
    InvalidMonitorInterval(u64),

    #[error("invalid diagnosis_budget_usd: {0}. Must be positive")]
    InvalidDiagnosisBudget(f64),

    #[error("invalid fix_budget_usd: {0}. Must be positive")]
    InvalidFixBudget(f64),

    #[error(
        "invalid backoff configuration: initial_backoff_ms ({0}) must be less than max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("memory.base_url is set but memory.token is missing (and vice versa)")]
    IncompleteMemoryConfig,

    #[error("telegram.bot_token is set but telegram.chat_id is missing (and vice versa)")]
    IncompleteTelegramConfig,
}

/// Configuration loader with hierarchical merging.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging.
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (`Serialized`)
    /// 2. `~/.piv/config.yaml` (primary config, created by `piv init`)
    /// 3. `~/.piv/local.yaml` (optional local overrides)
    /// 4. Nested environment variables (`PIV_` prefix, `__` nesting
    ///    separator) — used for credentials, which have no single
    ///    documented flat name (`PIV_TELEGRAM__BOT_TOKEN`, etc.)
    /// 5. The flat, individually-named environment variables
    ///    (`PIV_MONITOR_INTERVAL_MS` and siblings)
    ///
    /// Configuration is host-global, not project-local, because one
    /// supervisor watches every registered project on the machine.
    pub fn load() -> Result<Config> {
        let home = home_dir();
        Self::load_from_dir(&home.join(".piv"))
    }

    /// Load configuration rooted at a specific directory, primarily for tests.
    pub fn load_from_dir(config_dir: &Path) -> Result<Config> {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(config_dir.join("config.yaml")))
            .merge(Yaml::file(config_dir.join("local.yaml")))
            .merge(Env::prefixed("PIV_").split("__"));

        if let Some(overrides) = flat_env_overrides_yaml() {
            figment = figment.merge(Yaml::string(&overrides));
        }

        let config: Config = figment.extract().context("failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading.
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if config.monitor.monitor_interval_ms == 0 {
            return Err(ConfigError::InvalidMonitorInterval(0));
        }

        if config.interventor.diagnosis_budget_usd <= 0.0 {
            return Err(ConfigError::InvalidDiagnosisBudget(config.interventor.diagnosis_budget_usd));
        }

        if config.interventor.fix_budget_usd <= 0.0 {
            return Err(ConfigError::InvalidFixBudget(config.interventor.fix_budget_usd));
        }

        if config.retry.initial_backoff_ms >= config.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(config.retry.initial_backoff_ms, config.retry.max_backoff_ms));
        }

        if config.memory.base_url.is_some() != config.memory.token.is_some() {
            return Err(ConfigError::IncompleteMemoryConfig);
        }

        if config.telegram.bot_token.is_some() != config.telegram.chat_id.is_some() {
            return Err(ConfigError::IncompleteTelegramConfig);
        }

        Ok(())
    }
}

/// Dotted config path for each individually-documented environment
/// variable. Unlike the generic `PIV_` `__`-nested form, these flat names
/// don't decompose mechanically (`PIV_MAX_RESTART_ATTEMPTS` has no
/// `monitor` segment in it), so the mapping is spelled out by hand.
const FLAT_ENV_VARS: &[(&str, &str)] = &[
    ("PIV_MONITOR_INTERVAL_MS", "monitor.monitor_interval_ms"),
    ("PIV_HEARTBEAT_STALE_MS", "monitor.heartbeat_stale_ms"),
    ("PIV_MAX_RESTART_ATTEMPTS", "monitor.max_restart_attempts"),
    ("PIV_DIAGNOSIS_BUDGET_USD", "interventor.diagnosis_budget_usd"),
    ("PIV_FIX_BUDGET_USD", "interventor.fix_budget_usd"),
    ("PIV_DIAGNOSIS_MAX_TURNS", "interventor.diagnosis_max_turns"),
    ("PIV_FIX_MAX_TURNS", "interventor.fix_max_turns"),
    ("PIV_INTERVENTION_TIMEOUT_MS", "interventor.intervention_timeout_ms"),
    ("PIV_MEMORY_SEARCH_THRESHOLD", "memory.search_threshold"),
    ("PIV_MEMORY_SEARCH_LIMIT", "memory.search_limit"),
];

/// Build a YAML document containing only the flat, individually-named
/// environment variables that are actually set, nested under their
/// dotted config path. Returns `None` when none of them are set, so the
/// caller can skip the merge entirely.
fn flat_env_overrides_yaml() -> Option<String> {
    let mut doc = serde_yaml::Mapping::new();

    for (env_name, dotted_path) in FLAT_ENV_VARS {
        let Ok(raw) = std::env::var(env_name) else { continue };
        let Some(value) = parse_numeric(&raw) else { continue };
        insert_dotted(&mut doc, dotted_path, value);
    }

    if doc.is_empty() {
        None
    } else {
        serde_yaml::to_string(&doc).ok()
    }
}

/// Parse as an integer first so integer-typed fields (turn caps, byte
/// counts, millisecond durations) don't round-trip through `f64` and
/// fail to deserialize; fall back to float for budgets and thresholds.
fn parse_numeric(raw: &str) -> Option<serde_yaml::Value> {
    if let Ok(i) = raw.parse::<i64>() {
        return Some(serde_yaml::Value::from(i));
    }
    raw.parse::<f64>().ok().map(serde_yaml::Value::from)
}

/// Insert `value` into `doc` at a dotted path, creating intermediate
/// mapping nodes as needed.
fn insert_dotted(doc: &mut serde_yaml::Mapping, dotted_path: &str, value: serde_yaml::Value) {
    let mut segments = dotted_path.split('.');
    let Some(first) = segments.next() else { return };
    let mut node = doc
        .entry(serde_yaml::Value::from(first))
        .or_insert_with(|| serde_yaml::Value::Mapping(serde_yaml::Mapping::new()));

    let mut remaining: Vec<&str> = segments.collect();
    while remaining.len() > 1 {
        let segment = remaining.remove(0);
        let serde_yaml::Value::Mapping(map) = node else { return };
        node = map.entry(serde_yaml::Value::from(segment)).or_insert_with(|| serde_yaml::Value::Mapping(serde_yaml::Mapping::new()));
    }

    if let (serde_yaml::Value::Mapping(map), Some(leaf)) = (node, remaining.first()) {
        map.insert(serde_yaml::Value::from(*leaf), value);
    }
}

/// Expand a leading `~` in a config path to the user's home directory.
#[must_use]
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        home_dir().join(rest)
    } else {
        PathBuf::from(path)
    }
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."))
}
