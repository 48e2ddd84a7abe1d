//! Failure entries recorded by an orchestrator in its project-local state
//! file, and read (never written) by the supervisor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed taxonomy of error categories an orchestrator can report.
///
/// `Other` exists so a forward-incompatible orchestrator build can still
/// be parsed; the classifier and planner treat `Other` exactly like any
/// other `execution_error` category, never as a distinct case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    TestFailure,
    BuildFailure,
    TypeCheckFailure,
    LintFailure,
    Timeout,
    ToolError,
    AuthFailure,
    #[serde(other)]
    Other,
}

/// Resolution state of a failure entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Not yet looked at by the supervisor; eligible for classification.
    Pending,
    /// The supervisor's hot-fix validated and was applied.
    AutoFixed,
    /// A hot-fix was attempted but failed validation and was reverted.
    RolledBack,
    /// The supervisor gave up and notified a human.
    Escalated,
}

/// One failure entry as recorded in `<project-path>/.agents/manifest.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureEntry {
    /// The command that failed.
    pub command: String,
    /// Phase index the failure occurred in.
    pub phase: i64,
    /// Closed-taxonomy error category.
    pub error_category: ErrorCategory,
    /// Free-text detail (e.g. stderr excerpt), possibly long.
    pub error_details: String,
    /// How many times this failure has been retried by the orchestrator.
    pub retry_count: u32,
    /// Retry ceiling configured for this project.
    pub max_retries: u32,
    /// Current resolution state.
    pub resolution: Resolution,
    /// When this failure was recorded.
    pub timestamp: DateTime<Utc>,
}

impl FailureEntry {
    /// True if this entry is still eligible for classification.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self.resolution, Resolution::Pending)
    }

    /// First `n` characters of the detail text, used to build AI prompts
    /// and memory queries without shipping arbitrarily large blobs.
    #[must_use]
    pub fn detail_excerpt(&self, n: usize) -> String {
        self.error_details.chars().take(n).collect()
    }
}

/// The project-local state file's shape, as read (not written) by the
/// supervisor. Any fields the orchestrator writes that the supervisor
/// does not care about are simply absent from this struct and ignored by
/// serde on deserialize... except serde_yaml does not ignore unknown
/// fields by default, which is exactly what we want: forward-compatible
/// reads of a file we never write.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectState {
    /// Sequence of failure entries, oldest first.
    #[serde(default)]
    pub failures: Vec<FailureEntry>,
}

impl ProjectState {
    /// All entries still pending, in file order (oldest first).
    #[must_use]
    pub fn pending_failures(&self) -> Vec<&FailureEntry> {
        self.failures.iter().filter(|f| f.is_pending()).collect()
    }

    /// The most recently recorded pending failure, if any.
    #[must_use]
    pub fn latest_pending_failure(&self) -> Option<&FailureEntry> {
        self.failures.iter().filter(|f| f.is_pending()).max_by_key(|f| f.timestamp)
    }
}
