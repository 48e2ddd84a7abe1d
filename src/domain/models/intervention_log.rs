//! `InterventionLogEntry`: one append-only record per cycle-action.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::classification::StallType;

/// One entry in the structured (JSONL) side of the intervention log.
/// The human-readable markdown log is a rendering of the same facts,
/// written alongside it — see `infrastructure::intervention_log`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterventionLogEntry {
    /// When this entry was written.
    pub timestamp: DateTime<Utc>,
    /// Project this entry is about.
    pub project: String,
    /// Stall type that triggered this cycle-action, if any (absent for a
    /// propagation-only entry triggered by another project's fix).
    pub stall_type: Option<StallType>,
    /// What the supervisor did (`restart`, `diagnose`, `escalate`, ...).
    pub action: String,
    /// Free-text human-readable outcome, e.g. `"restarted orchestrator (pid=4821)"`.
    pub outcome: String,
    /// Root cause text, if this entry followed a diagnosis.
    pub diagnostic_root_cause: Option<String>,
    /// Target file of a fix, if one was attempted.
    pub fix_file: Option<String>,
    /// Total AI session cost in USD for this cycle-action, if any.
    pub cost_usd: Option<f64>,
    /// Ids of memory records consulted before diagnosis.
    pub memory_ids_consulted: Vec<String>,
    /// Id of the memory record written after a successful fix, if any.
    pub memory_id_written: Option<String>,
}

impl InterventionLogEntry {
    /// Minimal constructor for actions with no diagnosis/fix attached
    /// (restart, restart-with-preamble, plain escalation).
    #[must_use]
    pub fn simple(project: impl Into<String>, stall_type: StallType, action: impl Into<String>, outcome: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            project: project.into(),
            stall_type: Some(stall_type),
            action: action.into(),
            outcome: outcome.into(),
            diagnostic_root_cause: None,
            fix_file: None,
            cost_usd: None,
            memory_ids_consulted: Vec::new(),
            memory_id_written: None,
        }
    }

    /// Render this entry as a single human-readable markdown line.
    #[must_use]
    pub fn to_markdown_line(&self) -> String {
        let mut line = format!(
            "- `{}` **{}** action=`{}` outcome=\"{}\"",
            self.timestamp.to_rfc3339(),
            self.project,
            self.action,
            self.outcome
        );
        if let Some(ref cause) = self.diagnostic_root_cause {
            line.push_str(&format!(" root_cause=\"{cause}\""));
        }
        if let Some(ref file) = self.fix_file {
            line.push_str(&format!(" fix_file=`{file}`"));
        }
        if let Some(cost) = self.cost_usd {
            line.push_str(&format!(" cost_usd={cost:.4}"));
        }
        line
    }
}
