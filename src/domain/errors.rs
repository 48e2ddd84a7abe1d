//! Domain-level error types: one enum per concern (registry, process
//! supervision, AI driver, notifier, memory, config), each with an
//! `is_transient`/`is_permanent` helper so callers can decide whether a
//! failure is worth retrying without matching on every variant.

use thiserror::Error;

/// Errors surfaced by registry read/write/lock operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry file not found at {0}")]
    NotFound(String),

    #[error("failed to acquire registry lock within {0:?}")]
    LockTimeout(std::time::Duration),

    #[error("registry I/O error: {0}")]
    Io(String),

    #[error("registry YAML malformed: {0}")]
    Malformed(String),

    #[error("project not found: {0}")]
    ProjectNotFound(String),

    #[error("project already registered: {0}")]
    ProjectAlreadyRegistered(String),
}

impl RegistryError {
    /// Returns true if retrying the same operation could succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::LockTimeout(_) | Self::Io(_))
    }
}

/// Errors surfaced by process supervision (liveness probe, spawn, kill).
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn orchestrator: {0}")]
    SpawnFailed(String),

    #[error("failed to signal pid {pid}: {source}")]
    SignalFailed { pid: i32, source: String },

    #[error("orchestrator did not exit within {0:?} of SIGKILL")]
    TerminationTimeout(std::time::Duration),
}

impl ProcessError {
    /// Returns true if retrying the same operation could succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::SpawnFailed(_))
    }
}

/// Errors surfaced by the AI driver (spawning and parsing a CLI session).
#[derive(Debug, Error)]
pub enum AiDriverError {
    #[error("failed to spawn AI session: {0}")]
    SpawnFailed(String),

    #[error("AI session exceeded its budget of ${0:.2}")]
    BudgetExceeded(f64),

    #[error("AI session exceeded its turn cap of {0}")]
    TurnCapExceeded(u32),

    #[error("AI session timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("failed to parse AI session output: {0}")]
    MalformedOutput(String),

    #[error("AI session exited with a non-zero status: {0}")]
    NonZeroExit(i32),

    #[error("AI session cancelled: supervisor is shutting down")]
    Cancelled,
}

impl AiDriverError {
    /// Returns true if retrying the same session could succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::SpawnFailed(_) | Self::Timeout(_))
    }

    /// Returns true if this is a hard stop — retrying would waste budget.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::BudgetExceeded(_) | Self::TurnCapExceeded(_))
    }
}

/// Errors surfaced by outbound HTTP calls to the Telegram Bot API.
#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("telegram request failed: {0}")]
    RequestFailed(String),

    #[error("telegram rate limited, retry after {0}s")]
    RateLimited(u64),

    #[error("telegram returned an error response: {0}")]
    ApiError(String),
}

impl NotifierError {
    /// Returns true if this error is transient and should be retried.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::RequestFailed(_) | Self::RateLimited(_))
    }
}

/// Errors surfaced by the fix-pattern memory client.
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("memory service request failed: {0}")]
    RequestFailed(String),

    #[error("memory service returned an error response: {0}")]
    ApiError(String),

    #[error("memory service not configured")]
    NotConfigured,
}

impl MemoryError {
    /// Returns true if this error is transient and should be retried.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::RequestFailed(_))
    }
}

/// Errors surfaced by configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(String),

    #[error("invalid YAML in {path}: {source}")]
    InvalidYaml { path: String, source: String },

    #[error("invalid environment variable {name}: {reason}")]
    InvalidEnvVar { name: String, reason: String },
}
