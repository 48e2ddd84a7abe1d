//! `RecoveryAction`: the output of the pure recovery planner.

use serde::{Deserialize, Serialize};

use super::classification::StallType;

/// The four recovery directives the planner can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryActionType {
    /// Kill any live orchestrator pid and spawn a fresh one.
    Restart,
    /// Same as `Restart`, but the new process is told to inject an
    /// autonomous preamble via a spawn argument.
    RestartWithPreamble,
    /// Drive the Interventor's diagnosis-then-fix pipeline.
    Diagnose,
    /// Notify the human operator and mark the failure escalated.
    Escalate,
}

/// One recovery directive, scoped to a single project for a single cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryAction {
    /// Which directive to execute.
    pub action_type: RecoveryActionType,
    /// The project this action targets.
    pub project_name: String,
    /// The stall type that produced this action, carried through for logging.
    pub stall_type: StallType,
    /// How many restart attempts have already been made for this
    /// (project, stall type) pair this supervisor uptime.
    pub restart_count_so_far: u32,
    /// Free-text detail for the intervention log.
    pub detail: String,
}
