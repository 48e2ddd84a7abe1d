//! `InterventionResult`: the Interventor's public contract output —
//! `intervene(project, classification, config) -> InterventionResult`.

use serde::{Deserialize, Serialize};

use super::diagnostic::DiagnosticResult;
use super::hotfix::HotFixResult;
use super::propagation::PropagationResult;

/// Outcome of one `Interventor::intervene` call for a single project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterventionResult {
    /// True only when a fix was attempted and validation passed.
    pub success: bool,
    /// True when the cycle fell through to human escalation.
    pub escalated: bool,
    /// The diagnosis session's output, if one ran.
    pub diagnosis: Option<DiagnosticResult>,
    /// The fix session's (post-validation) output, if one ran.
    pub hotfix: Option<HotFixResult>,
    /// The Propagator's output, if a framework fix triggered propagation.
    pub propagation: Option<PropagationResult>,
    /// Ids of memory records consulted before diagnosis.
    pub memory_ids_consulted: Vec<String>,
    /// Id of the memory record written after a successful fix, if any.
    pub memory_id_written: Option<String>,
    /// Free-text summary for the intervention log and, when escalated,
    /// the Telegram message body.
    pub detail: String,
}

impl InterventionResult {
    /// Phase C declined to attempt a fix, or diagnosis itself failed: no
    /// fix session ever ran.
    #[must_use]
    pub fn escalated_without_fix(diagnosis: Option<DiagnosticResult>, detail: impl Into<String>) -> Self {
        Self {
            success: false,
            escalated: true,
            diagnosis,
            hotfix: None,
            propagation: None,
            memory_ids_consulted: Vec::new(),
            memory_id_written: None,
            detail: detail.into(),
        }
    }

    /// A fix was attempted but failed validation and was reverted.
    #[must_use]
    pub fn escalated_after_failed_fix(diagnosis: DiagnosticResult, hotfix: HotFixResult, detail: impl Into<String>) -> Self {
        Self {
            success: false,
            escalated: true,
            diagnosis: Some(diagnosis),
            hotfix: Some(hotfix),
            propagation: None,
            memory_ids_consulted: Vec::new(),
            memory_id_written: None,
            detail: detail.into(),
        }
    }

    /// A fix was attempted and validation passed.
    #[must_use]
    pub fn fixed(diagnosis: DiagnosticResult, hotfix: HotFixResult, detail: impl Into<String>) -> Self {
        Self {
            success: true,
            escalated: false,
            diagnosis: Some(diagnosis),
            hotfix: Some(hotfix),
            propagation: None,
            memory_ids_consulted: Vec::new(),
            memory_id_written: None,
            detail: detail.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escalated_without_fix_carries_no_hotfix() {
        let result = InterventionResult::escalated_without_fix(None, "budget exceeded");
        assert!(result.escalated);
        assert!(!result.success);
        assert!(result.hotfix.is_none());
    }
}
