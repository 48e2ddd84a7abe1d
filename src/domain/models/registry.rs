//! The `Registry`: in-memory view of the full set of managed projects.
//!
//! This module is pure — no file I/O. Persistence lives in
//! `infrastructure::registry_store`, which reads/writes this type as YAML.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::project::Project;

/// The full registry: every known project keyed by its unique name.
///
/// A `BTreeMap` (rather than `HashMap`) keeps serialization order stable,
/// which keeps registry diffs small and deterministic across rewrites.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registry {
    /// Project name → Project.
    #[serde(default)]
    pub projects: BTreeMap<String, Project>,
    /// Timestamp of the last successful write.
    #[serde(default = "Utc::now")]
    pub last_updated: DateTime<Utc>,
}

impl Registry {
    /// An empty registry, as returned by `read()` when no file exists yet.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            projects: BTreeMap::new(),
            last_updated: Utc::now(),
        }
    }

    /// Insert or replace a project by name.
    pub fn register(&mut self, project: Project) {
        self.projects.insert(project.name.clone(), project);
        self.last_updated = Utc::now();
    }

    /// Remove a project by name. Returns the removed project, if any.
    pub fn deregister(&mut self, name: &str) -> Option<Project> {
        let removed = self.projects.remove(name);
        if removed.is_some() {
            self.last_updated = Utc::now();
        }
        removed
    }

    /// All projects whose status is `Running`, in name order.
    #[must_use]
    pub fn list_running(&self) -> Vec<&Project> {
        self.projects
            .values()
            .filter(|p| matches!(p.status, super::project::ProjectStatus::Running))
            .collect()
    }

    /// Look up a project by its unique name.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&Project> {
        self.projects.get(name)
    }

    /// Look up a project by its absolute path.
    #[must_use]
    pub fn find_by_path(&self, path: &str) -> Option<&Project> {
        self.projects.values().find(|p| p.path == path)
    }

    /// Mutable lookup by name, used by the monitor to update heartbeat/pid
    /// fields without re-serializing the whole map.
    pub fn find_by_name_mut(&mut self, name: &str) -> Option<&mut Project> {
        self.projects.get_mut(name)
    }
}
