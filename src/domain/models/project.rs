//! The `Project` entity: a single registered, watched project.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a registered project, as tracked by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    /// An orchestrator is (or is believed to be) actively running.
    Running,
    /// No orchestrator is running; nothing to monitor this cycle.
    Idle,
    /// The project's work is done; excluded from monitoring.
    Complete,
    /// The orchestrator exited in a terminal failure state.
    Failed,
}

/// A single project tracked by the supervisor.
///
/// Field names use `camelCase` on the wire because the registry YAML is
/// also read by the orchestrator process, which writes `camelCase` keys
/// for its own heartbeat updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Unique, stable project name. The registry key.
    pub name: String,
    /// Absolute path to the project directory on disk.
    pub path: String,
    /// Current lifecycle status.
    pub status: ProjectStatus,
    /// Timestamp of the most recent heartbeat written by the orchestrator.
    pub heartbeat: DateTime<Utc>,
    /// Current phase index, if the orchestrator has started one.
    pub current_phase: Option<i64>,
    /// Last phase the orchestrator completed.
    pub last_completed_phase: Option<i64>,
    /// Opaque framework version tag (git SHA or asset-set hash).
    pub piv_commands_version: String,
    /// OS pid of the running orchestrator process, if any.
    pub orchestrator_pid: Option<i32>,
    /// When this project was first registered.
    pub registered_at: DateTime<Utc>,
    /// Bookkeeping the supervisor itself maintains; absent in registry
    /// files written before this field existed, so `status`/reporting
    /// degrade gracefully rather than failing to parse.
    #[serde(default)]
    pub cycle_metadata: CycleMetadata,
}

/// Supervisor-owned bookkeeping about the most recent cycle that touched
/// this project. Not written by the orchestrator; purely supervisor state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleMetadata {
    /// Timestamp of the last monitor cycle that considered this project.
    pub last_cycle_at: Option<DateTime<Utc>>,
    /// Human-readable description of the last action taken, if any.
    pub last_action: Option<String>,
}

impl Project {
    /// True if the orchestrator pid is set and the project is marked running.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self.status, ProjectStatus::Running) && self.orchestrator_pid.is_some()
    }

    /// Age of the last heartbeat relative to `now`.
    ///
    /// Clock skew (heartbeat in the future) is clamped to zero rather than
    /// producing a negative duration.
    #[must_use]
    pub fn heartbeat_age(&self, now: DateTime<Utc>) -> chrono::Duration {
        let raw = now - self.heartbeat;
        if raw < chrono::Duration::zero() {
            chrono::Duration::zero()
        } else {
            raw
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(status: ProjectStatus, pid: Option<i32>) -> Project {
        Project {
            name: "demo".to_string(),
            path: "/tmp/demo".to_string(),
            status,
            heartbeat: Utc::now(),
            current_phase: Some(2),
            last_completed_phase: Some(1),
            piv_commands_version: "abc123".to_string(),
            orchestrator_pid: pid,
            registered_at: Utc::now(),
            cycle_metadata: CycleMetadata::default(),
        }
    }

    #[test]
    fn is_running_requires_both_status_and_pid() {
        assert!(sample(ProjectStatus::Running, Some(123)).is_running());
        assert!(!sample(ProjectStatus::Running, None).is_running());
        assert!(!sample(ProjectStatus::Idle, Some(123)).is_running());
    }

    #[test]
    fn heartbeat_age_clamps_future_skew_to_zero() {
        let mut p = sample(ProjectStatus::Running, Some(1));
        p.heartbeat = Utc::now() + chrono::Duration::seconds(30);
        assert_eq!(p.heartbeat_age(Utc::now()), chrono::Duration::zero());
    }

    #[test]
    fn heartbeat_age_positive_for_stale_heartbeat() {
        let mut p = sample(ProjectStatus::Running, Some(1));
        let now = Utc::now();
        p.heartbeat = now - chrono::Duration::seconds(1000);
        assert!(p.heartbeat_age(now) >= chrono::Duration::seconds(1000));
    }
}
