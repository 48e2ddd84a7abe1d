//! Port traits: the boundary between services and infrastructure.
//!
//! Each trait is `async_trait`, `Send + Sync`, one method per capability,
//! with errors returned as a domain-level enum rather than `anyhow::Error`.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::errors::{AiDriverError, MemoryError, NotifierError, ProcessError};
use super::models::{DiagnosticResult, FixRecord, FixRecordHit, HotFixResult};

/// A request to run a read-only diagnosis AI session against a project.
#[derive(Debug, Clone)]
pub struct DiagnosisRequest {
    pub project_path: String,
    pub prompt: String,
    pub budget_usd: f64,
    pub max_turns: u32,
    pub timeout: std::time::Duration,
    /// Cancelled when the supervisor is shutting down; the session must
    /// stop promptly rather than run to its full timeout.
    pub cancel: CancellationToken,
}

/// A request to run a write-capable fix AI session against a project.
#[derive(Debug, Clone)]
pub struct FixRequest {
    pub project_path: String,
    pub prompt: String,
    pub budget_usd: f64,
    pub max_turns: u32,
    pub timeout: std::time::Duration,
    /// Cancelled when the supervisor is shutting down; the session must
    /// stop promptly rather than run to its full timeout.
    pub cancel: CancellationToken,
}

/// Spawns and drives AI coding-agent sessions (the `claude` CLI in
/// practice), enforcing budget/turn/timeout caps and parsing the
/// session's streamed JSONL output into domain results.
#[async_trait]
pub trait AiDriver: Send + Sync {
    /// Run a read-only diagnosis session and return its structured result.
    async fn diagnose(&self, request: DiagnosisRequest) -> Result<DiagnosticResult, AiDriverError>;

    /// Run a write-capable fix session and return its structured result.
    /// The caller is responsible for independently validating the change
    /// (type-check, tests) — this method reports what the session did,
    /// it does not itself judge success.
    async fn fix(&self, request: FixRequest, diagnosis: &DiagnosticResult) -> Result<HotFixResult, AiDriverError>;
}

/// Sends human-facing escalation notifications (Telegram in practice).
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send a plain-text (HTML-escaped) message. Implementations are
    /// responsible for chunking messages over the wire's length limit.
    async fn notify(&self, message: &str) -> Result<(), NotifierError>;
}

/// Reads and writes fix-pattern records in the external memory service.
#[async_trait]
pub trait FixMemory: Send + Sync {
    /// Search for prior fix records relevant to a project/error pair.
    /// `category`, when set, is sent as a `metadata_filter` so the service
    /// narrows results to records tagged with that `error_category`.
    /// `min_score`, when set, is sent as a `threshold` so filtering by
    /// similarity happens server-side instead of after every hit has
    /// already been fetched. Returns an empty vec, never an error, when
    /// the service is not configured — callers should use `FixMemory`
    /// unconditionally and let the no-op implementation (or an
    /// unconfigured real client) degrade gracefully.
    async fn search(
        &self,
        container_tag: &str,
        query: &str,
        limit: u32,
        category: Option<&str>,
        min_score: Option<f64>,
    ) -> Result<Vec<FixRecordHit>, MemoryError>;

    /// Store or update a fix record by its idempotent custom id.
    async fn store(&self, record: FixRecord) -> Result<(), MemoryError>;
}

/// Probes and controls OS processes (the orchestrator subprocess).
#[async_trait]
pub trait ProcessProbe: Send + Sync {
    /// Non-blocking liveness check via signal 0.
    fn is_alive(&self, pid: i32) -> bool;

    /// Send SIGKILL and wait up to `timeout` for the process to exit.
    async fn terminate(&self, pid: i32, timeout: std::time::Duration) -> Result<(), ProcessError>;

    /// Spawn a detached orchestrator process for `project_path`, optionally
    /// passing a preamble injection flag. Returns the new process's pid.
    async fn spawn_orchestrator(&self, project_path: &str, with_preamble: bool) -> Result<i32, ProcessError>;
}

/// Generates fresh AI session ids, factored out as a port purely so pure
/// services never call `Uuid::new_v4()` directly and stay trivially testable.
pub trait IdGenerator: Send + Sync {
    fn new_id(&self) -> Uuid;
}

/// Outcome of running one validation command against a project.
#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    /// True only if every command in the batch exited successfully.
    pub passed: bool,
    /// Combined stdout+stderr of every command run, in order, for the log.
    pub output: String,
}

/// Independently re-runs a project's type-check and test commands after a
/// hot-fix session claims success — the supervisor never trusts the AI
/// session's self-report of whether validation passed.
#[async_trait]
pub trait Validator: Send + Sync {
    /// Run `commands` in sequence inside `project_path`. Stops at the first
    /// failing command; `output` still carries everything run so far.
    async fn validate(
        &self,
        project_path: &str,
        commands: &[String],
        timeout: std::time::Duration,
    ) -> Result<ValidationOutcome, ProcessError>;
}
