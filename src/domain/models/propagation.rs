//! `PropagationResult`: output of distributing a validated framework fix.

use serde::{Deserialize, Serialize};

/// Per-project outcome of a propagation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropagationOutcome {
    /// Files copied, registry version bumped, orchestrator restarted.
    Updated,
    /// Project already at the canonical version; nothing to do.
    Skipped,
    /// File copy or version bump failed.
    Failed,
    /// Files copied and version bumped, but the orchestrator restart failed.
    RestartFailed,
}

/// Result of one propagation pass across every registered project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropagationResult {
    /// Per-project outcome, in the order projects were processed.
    pub outcomes: Vec<(String, PropagationOutcome)>,
    /// Relative paths of the framework files that were propagated.
    pub files_propagated: Vec<String>,
    /// Count of projects whose orchestrator was successfully restarted.
    pub projects_restarted: u32,
}

impl PropagationResult {
    /// Number of projects that ended in `Updated`.
    #[must_use]
    pub fn updated_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, PropagationOutcome::Updated))
            .count()
    }

    /// Number of projects that ended in `Failed` or `RestartFailed`.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, PropagationOutcome::Failed | PropagationOutcome::RestartFailed))
            .count()
    }
}
