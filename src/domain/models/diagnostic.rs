//! `DiagnosticResult`: structured output of the Interventor's read-only
//! diagnosis session.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where the Interventor's diagnosis session located the bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BugLocation {
    /// Target file is inside the canonical framework directory (or a
    /// cross-project recurrence was detected across the fleet).
    FrameworkBug,
    /// Target file is inside the project's own source tree.
    ProjectBug,
    /// Root cause references credentials/auth/environment/external config.
    HumanRequired,
    /// Anything else, or an unrecognized/missing target file.
    Ambiguous,
}

/// Structured output of a diagnosis AI session, re-validated by the
/// supervisor before being trusted: target file must be within the
/// framework dir or the project dir, otherwise the location is forced
/// to `HumanRequired`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticResult {
    /// Where the bug was located, after the supervisor's own re-check.
    pub bug_location: BugLocation,
    /// Free-text root cause explanation.
    pub root_cause: String,
    /// Path to the file the fix should target, if one was identified.
    pub target_file: Option<String>,
    /// Inclusive 1-based line range within `target_file`, if known.
    pub line_range: Option<(u32, u32)>,
    /// One-paragraph summary of the recommended change.
    pub recommended_change: String,
    /// Estimated lines of diff the recommended change would require.
    pub estimated_lines: u32,
    /// Confidence the AI session reported for this diagnosis.
    pub confidence: super::classification::Confidence,
    /// Cost, in USD, of the diagnosis session.
    pub cost_usd: f64,
    /// Id of the underlying AI session, for cross-referencing logs.
    pub ai_session_id: Uuid,
}

impl DiagnosticResult {
    /// Whether the recommended change is precise and small enough to
    /// attempt a fix session for, independent of whether it has already
    /// been tried and failed this cycle — that check is the caller's
    /// responsibility since it needs the cycle log.
    #[must_use]
    pub fn is_fixable_shape(&self) -> bool {
        self.target_file.is_some()
            && self.estimated_lines > 0
            && self.estimated_lines <= 30
            && !self.recommended_change.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::classification::Confidence;

    fn base() -> DiagnosticResult {
        DiagnosticResult {
            bug_location: BugLocation::ProjectBug,
            root_cause: "off by one".to_string(),
            target_file: Some("src/lib.rs".to_string()),
            line_range: Some((10, 12)),
            recommended_change: "fix the loop bound".to_string(),
            estimated_lines: 3,
            confidence: Confidence::High,
            cost_usd: 0.12,
            ai_session_id: Uuid::nil(),
        }
    }

    #[test]
    fn fixable_shape_requires_target_file_and_bounded_lines() {
        assert!(base().is_fixable_shape());

        let mut no_file = base();
        no_file.target_file = None;
        assert!(!no_file.is_fixable_shape());

        let mut too_big = base();
        too_big.estimated_lines = 31;
        assert!(!too_big.is_fixable_shape());

        let mut zero = base();
        zero.estimated_lines = 0;
        assert!(!zero.is_fixable_shape());
    }
}
