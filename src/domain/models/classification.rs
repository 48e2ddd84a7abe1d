//! `StallClassification`: the output of the pure classifier.

use serde::{Deserialize, Serialize};

/// The four stall categories the classifier can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StallType {
    OrchestratorCrashed,
    AgentWaitingForInput,
    ExecutionError,
    SessionHung,
}

/// How confident the classifier is in a given classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// A classifier verdict for one project, produced only for stalled
/// projects — the classifier never constructs one for a healthy project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StallClassification {
    /// Name of the project this classification is about.
    pub project_name: String,
    /// Which of the four stall categories applies.
    pub stall_type: StallType,
    /// Confidence in the classification.
    pub confidence: Confidence,
    /// Heartbeat age, in milliseconds, at classification time.
    pub heartbeat_age_ms: i64,
    /// Short human-readable detail string (e.g. quotes the failure category).
    pub detail: String,
}
