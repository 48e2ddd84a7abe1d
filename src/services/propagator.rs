//! Distributes a validated framework hot fix to every registered project
//! whose framework version differs from the canonical one: copy the
//! changed files, bump the registry row's version, restart that
//! project's orchestrator. Grounded on the teacher's
//! `services::worktree_service` shape — iterate registered targets, act
//! on each, record a per-target outcome, never abort the whole batch on
//! one target's failure.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::domain::models::project::Project;
use crate::domain::models::{PropagationOutcome, PropagationResult};
use crate::domain::ports::ProcessProbe;
use crate::infrastructure::registry_store::RegistryStore;

/// Grace period given to a live orchestrator before the propagator forces
/// it down to make way for the freshly-propagated copy.
const TERMINATE_TIMEOUT: Duration = Duration::from_secs(10);

/// Copies validated framework fixes out to every project pinned to a
/// stale framework version.
pub struct Propagator {
    registry: Arc<RegistryStore>,
    process: Arc<dyn ProcessProbe>,
}

impl Propagator {
    #[must_use]
    pub fn new(registry: Arc<RegistryStore>, process: Arc<dyn ProcessProbe>) -> Self {
        Self { registry, process }
    }

    /// Propagate `changed_relative_paths` (relative to `framework_source_dir`)
    /// to every project whose `pivCommandsVersion` is not already
    /// `new_version`. Projects are processed sequentially — the dev-kit
    /// source is explicit that only one orchestrator at a time should be
    /// touched on a given host.
    pub async fn propagate(
        &self,
        framework_source_dir: &str,
        changed_relative_paths: &[String],
        new_version: &str,
    ) -> PropagationResult {
        let snapshot = match self.registry.read() {
            Ok(registry) => registry,
            Err(e) => {
                warn!(error = %e, "propagation aborted: registry unreadable");
                return PropagationResult::default();
            }
        };

        let stale: Vec<Project> =
            snapshot.projects.values().filter(|p| p.piv_commands_version != new_version).cloned().collect();

        let mut result = PropagationResult {
            files_propagated: changed_relative_paths.to_vec(),
            ..PropagationResult::default()
        };

        for project in stale {
            let outcome = self.propagate_one(framework_source_dir, &project, changed_relative_paths, new_version).await;
            if matches!(outcome, PropagationOutcome::Updated) {
                result.projects_restarted += 1;
            }
            result.outcomes.push((project.name.clone(), outcome));
        }

        result
    }

    async fn propagate_one(
        &self,
        framework_source_dir: &str,
        project: &Project,
        changed_relative_paths: &[String],
        new_version: &str,
    ) -> PropagationOutcome {
        if let Err(e) = Self::copy_files(framework_source_dir, &project.path, changed_relative_paths) {
            warn!(project = %project.name, error = %e, "propagation copy failed");
            return PropagationOutcome::Failed;
        }

        let bump_result = self.registry.update(|r| {
            if let Some(p) = r.find_by_name_mut(&project.name) {
                p.piv_commands_version = new_version.to_string();
                Ok(())
            } else {
                Err(crate::domain::errors::RegistryError::ProjectNotFound(project.name.clone()))
            }
        });
        if let Err(e) = bump_result {
            warn!(project = %project.name, error = %e, "propagation version bump failed");
            return PropagationOutcome::Failed;
        }

        if let Some(pid) = project.orchestrator_pid {
            if self.process.is_alive(pid) {
                if let Err(e) = self.process.terminate(pid, TERMINATE_TIMEOUT).await {
                    warn!(project = %project.name, pid, error = %e, "failed to terminate stale orchestrator before restart");
                }
            }
        }

        match self.process.spawn_orchestrator(&project.path, false).await {
            Ok(new_pid) => {
                let restart_result = self.registry.update(|r| {
                    if let Some(p) = r.find_by_name_mut(&project.name) {
                        p.orchestrator_pid = Some(new_pid);
                        p.heartbeat = chrono::Utc::now();
                        p.status = crate::domain::models::ProjectStatus::Running;
                        Ok(())
                    } else {
                        Err(crate::domain::errors::RegistryError::ProjectNotFound(project.name.clone()))
                    }
                });
                if let Err(e) = restart_result {
                    warn!(project = %project.name, error = %e, "failed to record restarted orchestrator pid");
                    return PropagationOutcome::RestartFailed;
                }
                info!(project = %project.name, pid = new_pid, "propagated framework fix and restarted orchestrator");
                PropagationOutcome::Updated
            }
            Err(e) => {
                warn!(project = %project.name, error = %e, "propagation restart failed");
                PropagationOutcome::RestartFailed
            }
        }
    }

    fn copy_files(framework_source_dir: &str, project_path: &str, relative_paths: &[String]) -> std::io::Result<()> {
        for relative in relative_paths {
            let source = std::path::Path::new(framework_source_dir).join(relative);
            let dest = std::path::Path::new(project_path).join(relative);
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(&source, &dest)?;
        }
        Ok(())
    }
}
