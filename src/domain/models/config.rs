//! Supervisor configuration structure.
//!
//! One struct per concern, `#[serde(default = "default_x")]` per field, a
//! `const fn default_x()` wherever the type allows it. Loading (figment
//! merge of defaults → `~/.piv/config.yaml` → `~/.piv/local.yaml` →
//! `PIV_`-prefixed env) lives in `infrastructure::config::ConfigLoader`.

use serde::{Deserialize, Serialize};

/// Top-level supervisor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Monitor loop scheduling and stall-detection thresholds.
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// Interventor AI-session budgets, turn caps, and timeout.
    #[serde(default)]
    pub interventor: InterventorConfig,
    /// Fix-pattern memory service connection (optional capability).
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Telegram escalation channel (optional capability).
    #[serde(default)]
    pub telegram: TelegramConfig,
    /// Canonical on-disk paths for the registry, log, and framework source.
    #[serde(default)]
    pub paths: PathsConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Retry policy for transient I/O.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            monitor: MonitorConfig::default(),
            interventor: InterventorConfig::default(),
            memory: MemoryConfig::default(),
            telegram: TelegramConfig::default(),
            paths: PathsConfig::default(),
            logging: LoggingConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

/// Monitor loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MonitorConfig {
    /// Milliseconds between the start of one cycle and the next.
    #[serde(default = "default_monitor_interval_ms")]
    pub monitor_interval_ms: u64,
    /// Heartbeat age, in milliseconds, at or beyond which a project is stale.
    #[serde(default = "default_heartbeat_stale_ms")]
    pub heartbeat_stale_ms: i64,
    /// Restart-attempt ceiling before the planner escalates.
    #[serde(default = "default_max_restart_attempts")]
    pub max_restart_attempts: u32,
    /// Binary name or path used to probe and restart a project's
    /// orchestrator process. Not named anywhere else, so this is the one
    /// place it's configured; per-project overrides aren't modeled since
    /// every registered project runs the same orchestrator entry point.
    #[serde(default = "default_orchestrator_command")]
    pub orchestrator_command: String,
}

const fn default_monitor_interval_ms() -> u64 {
    900_000
}

const fn default_heartbeat_stale_ms() -> i64 {
    900_000
}

const fn default_max_restart_attempts() -> u32 {
    3
}

fn default_orchestrator_command() -> String {
    "piv-orchestrator".to_string()
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            monitor_interval_ms: default_monitor_interval_ms(),
            heartbeat_stale_ms: default_heartbeat_stale_ms(),
            max_restart_attempts: default_max_restart_attempts(),
            orchestrator_command: default_orchestrator_command(),
        }
    }
}

/// Interventor budgets and timeouts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct InterventorConfig {
    /// USD budget cap for the read-only diagnosis session.
    #[serde(default = "default_diagnosis_budget_usd")]
    pub diagnosis_budget_usd: f64,
    /// USD budget cap for the write-capable fix session.
    #[serde(default = "default_fix_budget_usd")]
    pub fix_budget_usd: f64,
    /// Turn cap for the diagnosis session.
    #[serde(default = "default_diagnosis_max_turns")]
    pub diagnosis_max_turns: u32,
    /// Turn cap for the fix session.
    #[serde(default = "default_fix_max_turns")]
    pub fix_max_turns: u32,
    /// Wall-clock timeout, in milliseconds, for either session.
    #[serde(default = "default_intervention_timeout_ms")]
    pub intervention_timeout_ms: u64,
    /// Absolute path to the canonical framework (dev-kit) directory.
    #[serde(default)]
    pub framework_source_dir: Option<String>,
    /// Commands run, in order, to independently validate a fix session's
    /// change. Not spelled out by name anywhere else, so this is the one
    /// place a project's type-check/test invocation is configured.
    #[serde(default = "default_validation_commands")]
    pub validation_commands: Vec<String>,
}

fn default_validation_commands() -> Vec<String> {
    vec!["cargo check --workspace".to_string(), "cargo test --workspace".to_string()]
}

const fn default_diagnosis_budget_usd() -> f64 {
    0.50
}

const fn default_fix_budget_usd() -> f64 {
    2.00
}

const fn default_diagnosis_max_turns() -> u32 {
    15
}

const fn default_fix_max_turns() -> u32 {
    30
}

const fn default_intervention_timeout_ms() -> u64 {
    300_000
}

impl Default for InterventorConfig {
    fn default() -> Self {
        Self {
            diagnosis_budget_usd: default_diagnosis_budget_usd(),
            fix_budget_usd: default_fix_budget_usd(),
            diagnosis_max_turns: default_diagnosis_max_turns(),
            fix_max_turns: default_fix_max_turns(),
            intervention_timeout_ms: default_intervention_timeout_ms(),
            framework_source_dir: None,
            validation_commands: default_validation_commands(),
        }
    }
}

/// Fix-pattern memory service configuration. `base_url`/`token` being
/// unset silently disables the capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MemoryConfig {
    /// Base URL of the memory service, if configured.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Bearer token for the memory service, if configured.
    #[serde(default)]
    pub token: Option<String>,
    /// Minimum similarity score for the unscoped cross-project query.
    #[serde(default = "default_memory_search_threshold")]
    pub search_threshold: f64,
    /// Maximum number of results to retrieve per query.
    #[serde(default = "default_memory_search_limit")]
    pub search_limit: u32,
}

const fn default_memory_search_threshold() -> f64 {
    0.4
}

const fn default_memory_search_limit() -> u32 {
    5
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            token: None,
            search_threshold: default_memory_search_threshold(),
            search_limit: default_memory_search_limit(),
        }
    }
}

impl MemoryConfig {
    /// The memory capability is only available when both connection
    /// details are present.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.base_url.is_some() && self.token.is_some()
    }
}

/// Telegram escalation channel configuration. `bot_token`/`chat_id` being
/// unset silently disables the capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TelegramConfig {
    /// Bot token, used as a path segment in the Telegram Bot API URL.
    #[serde(default)]
    pub bot_token: Option<String>,
    /// Destination chat id.
    #[serde(default)]
    pub chat_id: Option<String>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self { bot_token: None, chat_id: None }
    }
}

impl TelegramConfig {
    /// The Telegram capability is only available when both fields are present.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.bot_token.is_some() && self.chat_id.is_some()
    }
}

/// Canonical on-disk paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PathsConfig {
    /// Path to the registry YAML file.
    #[serde(default = "default_registry_path")]
    pub registry_path: String,
    /// Path to the intervention log markdown file.
    #[serde(default = "default_intervention_log_path")]
    pub intervention_log_path: String,
    /// Path to the pid file written by `monitor`.
    #[serde(default = "default_pid_file_path")]
    pub pid_file_path: String,
    /// Ceiling, in milliseconds, on how long a registry read-modify-write
    /// waits to acquire the advisory lock before giving up.
    #[serde(default = "default_registry_lock_timeout_ms")]
    pub registry_lock_timeout_ms: u64,
}

fn default_registry_path() -> String {
    "~/.piv/registry.yaml".to_string()
}

fn default_intervention_log_path() -> String {
    "~/.piv/improvement-log.md".to_string()
}

fn default_pid_file_path() -> String {
    "~/.piv/supervisor.pid".to_string()
}

const fn default_registry_lock_timeout_ms() -> u64 {
    5_000
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            registry_path: default_registry_path(),
            intervention_log_path: default_intervention_log_path(),
            pid_file_path: default_pid_file_path(),
            registry_lock_timeout_ms: default_registry_lock_timeout_ms(),
        }
    }
}

/// Logging output configuration: level, format, and optional rotating
/// file destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format: json or pretty.
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Directory for rotating log files; `None` means stdout only.
    #[serde(default)]
    pub log_dir: Option<String>,
    /// Number of days to retain rotated logs.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

const fn default_retention_days() -> u32 {
    30
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            retention_days: default_retention_days(),
        }
    }
}

/// Retry policy for transient I/O and transient upstream-API failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Initial backoff delay in milliseconds.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Maximum backoff delay in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    500
}

const fn default_max_backoff_ms() -> u64 {
    30_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}
