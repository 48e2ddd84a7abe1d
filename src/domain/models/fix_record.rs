//! `FixRecord`: the shape stored in and retrieved from the external
//! fix-pattern memory service.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A flat metadata value: scalar or string list, matching the memory
/// service's "flat key → scalar/string-list map" contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Text(String),
    List(Vec<String>),
    Bool(bool),
}

/// A record describing one resolved error and its fix, written after a
/// successful hot fix and recalled before future diagnoses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixRecord {
    /// Idempotency key: writing the same id again updates, never duplicates.
    pub custom_id: String,
    /// Per-project container tag, used to scope project-local recall.
    pub container_tag: String,
    /// Structured markdown body describing error, cause, fix, and outcome.
    pub content: String,
    /// Flat metadata (error category, phase, project, fix type, severity,
    /// scenario, resolved).
    pub metadata: HashMap<String, MetadataValue>,
}

impl FixRecord {
    /// Build the canonical custom id for a (project, target file, error
    /// category) tuple, so re-fixing the same spot updates the same record
    /// rather than accumulating duplicates.
    #[must_use]
    pub fn custom_id_for(project: &str, target_file: &str, error_category: &str) -> String {
        format!("{project}::{target_file}::{error_category}")
    }
}

/// A single ranked search hit returned by the memory service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixRecordHit {
    /// The record's id.
    pub id: String,
    /// Similarity score in `[0.0, 1.0]`.
    pub score: f64,
    /// The record's content, rendered as "prior context, may be outdated"
    /// in the diagnosis prompt — never auto-applied.
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_id_is_stable_for_same_inputs() {
        let a = FixRecord::custom_id_for("proj", "src/lib.rs", "test_failure");
        let b = FixRecord::custom_id_for("proj", "src/lib.rs", "test_failure");
        assert_eq!(a, b);
    }

    #[test]
    fn custom_id_differs_for_different_inputs() {
        let a = FixRecord::custom_id_for("proj", "src/lib.rs", "test_failure");
        let b = FixRecord::custom_id_for("proj", "src/main.rs", "test_failure");
        assert_ne!(a, b);
    }
}
