//! Pure stall classifier: given a project row, the current time, its
//! project-local state, and a liveness probe result, decides whether the
//! project is stalled and into which of four categories. No I/O here —
//! callers gather the inputs, this module only judges them.

use chrono::{DateTime, Utc};

use crate::domain::models::failure::ProjectState;
use crate::domain::models::{Confidence, Project, StallClassification, StallType};

/// Decide whether `project` is stalled, evaluating the rules in order and
/// returning on first match. `None` means healthy — the classifier never
/// constructs a `StallClassification` for a healthy project.
#[must_use]
pub fn classify(
    project: &Project,
    now: DateTime<Utc>,
    heartbeat_stale_ms: i64,
    state: &ProjectState,
    pid_alive: bool,
    output_log_tail: Option<&str>,
) -> Option<StallClassification> {
    let age = project.heartbeat_age(now);
    let age_ms = age.num_milliseconds();

    if age_ms < heartbeat_stale_ms {
        return None;
    }

    if !pid_alive {
        return Some(StallClassification {
            project_name: project.name.clone(),
            stall_type: StallType::OrchestratorCrashed,
            confidence: Confidence::High,
            heartbeat_age_ms: age_ms,
            detail: "orchestrator pid is not alive".to_string(),
        });
    }

    if let Some(failure) = state.latest_pending_failure() {
        return Some(StallClassification {
            project_name: project.name.clone(),
            stall_type: StallType::ExecutionError,
            confidence: Confidence::High,
            heartbeat_age_ms: age_ms,
            detail: format!("pending failure: {}", category_label(&failure.error_category)),
        });
    }

    if output_log_tail.is_some_and(ends_with_question_like) {
        return Some(StallClassification {
            project_name: project.name.clone(),
            stall_type: StallType::AgentWaitingForInput,
            confidence: Confidence::Medium,
            heartbeat_age_ms: age_ms,
            detail: "session output tail looks like a question".to_string(),
        });
    }

    Some(StallClassification {
        project_name: project.name.clone(),
        stall_type: StallType::SessionHung,
        confidence: Confidence::Medium,
        heartbeat_age_ms: age_ms,
        detail: "heartbeat stale, pid alive, no pending failure or question detected".to_string(),
    })
}

fn category_label(category: &crate::domain::models::failure::ErrorCategory) -> &'static str {
    use crate::domain::models::failure::ErrorCategory;
    match category {
        ErrorCategory::TestFailure => "test_failure",
        ErrorCategory::BuildFailure => "build_failure",
        ErrorCategory::TypeCheckFailure => "type_check_failure",
        ErrorCategory::LintFailure => "lint_failure",
        ErrorCategory::Timeout => "timeout",
        ErrorCategory::ToolError => "tool_error",
        ErrorCategory::AuthFailure => "auth_failure",
        ErrorCategory::Other => "other",
    }
}

/// Lightweight heuristic: does the tail of a session's output log read
/// like the orchestrator is waiting on a question? Looks only at the
/// last non-blank line, so a question asked and then answered earlier in
/// the log does not trigger a false positive.
#[must_use]
pub fn ends_with_question_like(tail: &str) -> bool {
    const INTERROGATIVE_PREFIXES: &[&str] =
        &["do ", "does ", "can ", "could ", "should ", "what ", "which ", "how ", "why ", "would ", "is ", "are "];

    let Some(last_line) = tail.lines().rev().find(|l| !l.trim().is_empty()) else {
        return false;
    };
    let trimmed = last_line.trim();

    if trimmed.ends_with('?') {
        return true;
    }

    let lower = trimmed.to_lowercase();
    INTERROGATIVE_PREFIXES.iter().any(|p| lower.starts_with(p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::failure::{ErrorCategory, FailureEntry, Resolution};
    use crate::domain::models::project::{CycleMetadata, ProjectStatus};

    fn project(heartbeat: DateTime<Utc>) -> Project {
        Project {
            name: "demo".to_string(),
            path: "/tmp/demo".to_string(),
            status: ProjectStatus::Running,
            heartbeat,
            current_phase: Some(2),
            last_completed_phase: Some(1),
            piv_commands_version: "v1".to_string(),
            orchestrator_pid: Some(123),
            registered_at: Utc::now(),
            cycle_metadata: CycleMetadata::default(),
        }
    }

    fn stale_project(now: DateTime<Utc>) -> Project {
        project(now - chrono::Duration::milliseconds(900_001))
    }

    #[test]
    fn fresh_heartbeat_is_healthy() {
        let now = Utc::now();
        let p = project(now);
        let result = classify(&p, now, 900_000, &ProjectState::default(), true, None);
        assert!(result.is_none());
    }

    #[test]
    fn dead_pid_is_orchestrator_crashed_regardless_of_other_signals() {
        let now = Utc::now();
        let p = stale_project(now);
        let result = classify(&p, now, 900_000, &ProjectState::default(), false, Some("are you there?")).unwrap();
        assert_eq!(result.stall_type, StallType::OrchestratorCrashed);
        assert_eq!(result.confidence, Confidence::High);
    }

    #[test]
    fn pending_failure_outranks_question_heuristic() {
        let now = Utc::now();
        let p = stale_project(now);
        let state = ProjectState {
            failures: vec![FailureEntry {
                command: "cargo test".to_string(),
                phase: 2,
                error_category: ErrorCategory::TestFailure,
                error_details: "assertion failed".to_string(),
                retry_count: 0,
                max_retries: 3,
                resolution: Resolution::Pending,
                timestamp: now,
            }],
        };
        let result = classify(&p, now, 900_000, &state, true, Some("should I continue?")).unwrap();
        assert_eq!(result.stall_type, StallType::ExecutionError);
        assert!(result.detail.contains("test_failure"));
    }

    #[test]
    fn question_like_tail_without_pending_failure_waits_for_input() {
        let now = Utc::now();
        let p = stale_project(now);
        let result = classify(&p, now, 900_000, &ProjectState::default(), true, Some("Should I proceed with the migration?")).unwrap();
        assert_eq!(result.stall_type, StallType::AgentWaitingForInput);
        assert_eq!(result.confidence, Confidence::Medium);
    }

    #[test]
    fn no_signal_at_all_is_session_hung() {
        let now = Utc::now();
        let p = stale_project(now);
        let result = classify(&p, now, 900_000, &ProjectState::default(), true, Some("writing output.rs...")).unwrap();
        assert_eq!(result.stall_type, StallType::SessionHung);
    }

    #[test]
    fn missing_output_log_skips_question_rule_without_erroring() {
        let now = Utc::now();
        let p = stale_project(now);
        let result = classify(&p, now, 900_000, &ProjectState::default(), true, None).unwrap();
        assert_eq!(result.stall_type, StallType::SessionHung);
    }

    #[test]
    fn clock_skew_heartbeat_in_future_is_never_a_stall() {
        let now = Utc::now();
        let p = project(now + chrono::Duration::hours(1));
        let result = classify(&p, now, 900_000, &ProjectState::default(), true, None);
        assert!(result.is_none());
    }

    #[test]
    fn question_heuristic_ignores_earlier_lines() {
        assert!(!ends_with_question_like("Should I continue?\nWriting file output.rs"));
        assert!(ends_with_question_like("Writing file output.rs\nShould I continue?"));
    }
}
