//! Pure recovery planner: maps a stall classification plus the attempt
//! count seen so far this supervisor's uptime to exactly one recovery
//! directive. No I/O, no persisted state — the attempt counter lives in
//! the monitor loop's in-memory map and is handed in by the caller.

use crate::domain::models::{RecoveryAction, RecoveryActionType, StallClassification, StallType};

/// Decide the recovery action for `classification`, given how many
/// restart-style attempts have already been made this uptime for the
/// same (project, stall type) pair.
///
/// Total over `StallType` x attempt-count: every combination resolves to
/// exactly one action, so this function never needs to return an `Option`.
#[must_use]
pub fn plan(classification: &StallClassification, attempts_so_far: u32, max_attempts: u32) -> RecoveryAction {
    let project_name = classification.project_name.clone();
    let stall_type = classification.stall_type;

    match stall_type {
        // A crash is never retried-to-escalation: the process simply did
        // not exist, and bringing it back is always the right call.
        StallType::OrchestratorCrashed => RecoveryAction {
            action_type: RecoveryActionType::Restart,
            project_name,
            stall_type,
            restart_count_so_far: attempts_so_far,
            detail: classification.detail.clone(),
        },

        StallType::SessionHung => {
            if attempts_so_far < max_attempts {
                RecoveryAction {
                    action_type: RecoveryActionType::Restart,
                    project_name,
                    stall_type,
                    restart_count_so_far: attempts_so_far,
                    detail: classification.detail.clone(),
                }
            } else {
                RecoveryAction {
                    action_type: RecoveryActionType::Escalate,
                    project_name,
                    stall_type,
                    restart_count_so_far: attempts_so_far,
                    detail: format!("session_hung exceeded {max_attempts} restart attempts"),
                }
            }
        }

        StallType::AgentWaitingForInput => {
            if attempts_so_far < max_attempts {
                RecoveryAction {
                    action_type: RecoveryActionType::RestartWithPreamble,
                    project_name,
                    stall_type,
                    restart_count_so_far: attempts_so_far,
                    detail: classification.detail.clone(),
                }
            } else {
                RecoveryAction {
                    action_type: RecoveryActionType::Escalate,
                    project_name,
                    stall_type,
                    restart_count_so_far: attempts_so_far,
                    detail: format!("agent_waiting_for_input exceeded {max_attempts} preamble attempts"),
                }
            }
        }

        // Escalation for execution_error is produced by the Interventor
        // pathway (human_required diagnosis, or a failed hot-fix), never
        // by the planner directly — diagnose is always attempted first.
        StallType::ExecutionError => RecoveryAction {
            action_type: RecoveryActionType::Diagnose,
            project_name,
            stall_type,
            restart_count_so_far: attempts_so_far,
            detail: classification.detail.clone(),
        },
    }
}
