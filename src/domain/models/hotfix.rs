//! `HotFixResult`: structured output of the Interventor's write-capable
//! fix session, after the supervisor's independent validation.

use serde::{Deserialize, Serialize};

/// Result of attempting a single-file, ≤30-line hot fix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotFixResult {
    /// Whether the fix was accepted (validated and not reverted).
    pub success: bool,
    /// The single file modified, if the session made any change at all.
    pub file_modified: Option<String>,
    /// Total added + removed lines, as independently counted by the
    /// supervisor (not trusted from the AI session's own report).
    pub lines_changed: u32,
    /// Whether the project's type-check and test commands both passed.
    pub validation_passed: bool,
    /// Captured stdout+stderr of the validation commands, for the log.
    pub validation_output: String,
    /// Cost, in USD, of the fix session.
    pub cost_usd: f64,
    /// Whether the supervisor reverted the working copy after a failed
    /// validation.
    pub revert_performed: bool,
}

impl HotFixResult {
    /// File count ≤ 1 and lines changed ≤ 30 are hard preconditions for
    /// acceptance.
    #[must_use]
    pub fn meets_size_limits(&self) -> bool {
        self.file_modified.is_some() && self.lines_changed <= 30
    }

    /// Build the accepted, successful variant from raw validation facts.
    #[must_use]
    pub fn accepted(file: String, lines_changed: u32, cost_usd: f64, validation_output: String) -> Self {
        Self {
            success: true,
            file_modified: Some(file),
            lines_changed,
            validation_passed: true,
            validation_output,
            cost_usd,
            revert_performed: false,
        }
    }

    /// Build the reverted variant: validation failed, working copy restored.
    #[must_use]
    pub fn reverted(file: String, lines_changed: u32, cost_usd: f64, validation_output: String) -> Self {
        Self {
            success: false,
            file_modified: Some(file),
            lines_changed,
            validation_passed: false,
            validation_output,
            cost_usd,
            revert_performed: true,
        }
    }

    /// Build the never-attempted variant: the change didn't fit the
    /// size/precision preconditions, so no fix session was even started.
    #[must_use]
    pub fn not_attempted(cost_usd: f64) -> Self {
        Self {
            success: false,
            file_modified: None,
            lines_changed: 0,
            validation_passed: false,
            validation_output: String::new(),
            cost_usd,
            revert_performed: false,
        }
    }
}
