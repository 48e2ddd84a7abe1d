//! The Monitor: the top-level cycle scheduler. Each cycle walks every
//! registered project sequentially — classify, plan, dispatch, log — and
//! either loops on a fixed interval (`start`/`stop`, grounded on the
//! teacher's `SwarmOrchestrator` start/stop/shutdown-broadcast shape) or
//! runs exactly once for `monitor --once`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::domain::models::config::Config;
use crate::domain::models::{InterventionLogEntry, RecoveryActionType, StallType};
use crate::domain::ports::{Notifier, ProcessProbe};
use crate::infrastructure::intervention_log::InterventionLog;
use crate::infrastructure::project_state;
use crate::infrastructure::registry_store::RegistryStore;

use super::classifier;
use super::interventor::Interventor;
use super::recovery_planner;

/// Grace period given to a stale orchestrator before a restart action
/// force-kills it.
const TERMINATE_TIMEOUT: Duration = Duration::from_secs(10);

/// Grace period given to an in-flight cycle to wind down after `stop()`
/// cancels it, before the loop task is aborted outright.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Summary of one `run_once` pass, used by the CLI to pick an exit code
/// and print a human-readable/JSON report.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct CycleReport {
    pub projects_considered: u32,
    pub actions_taken: Vec<(String, String)>,
    pub escalation_count: u32,
}

impl CycleReport {
    #[must_use]
    pub const fn had_escalations(&self) -> bool {
        self.escalation_count > 0
    }
}

/// Lifecycle state of the monitor's background loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MonitorState {
    Stopped,
    Running,
}

/// Drives the periodic monitor loop over every registered project.
pub struct Monitor {
    registry: Arc<RegistryStore>,
    process: Arc<dyn ProcessProbe>,
    notifier: Arc<dyn Notifier>,
    interventor: Arc<Interventor>,
    intervention_log: InterventionLog,
    config: Config,

    restart_attempts: Arc<RwLock<HashMap<(String, StallType), u32>>>,
    state: Arc<RwLock<MonitorState>>,
    shutdown_tx: broadcast::Sender<()>,
    loop_handle: Arc<RwLock<Option<JoinHandle<()>>>>,
    /// Cancelled by `stop()`; threaded into every `Interventor::intervene`
    /// call so an in-flight AI session aborts promptly instead of running
    /// to its full timeout.
    cancel: CancellationToken,
}

impl Monitor {
    #[must_use]
    pub fn new(
        registry: Arc<RegistryStore>,
        process: Arc<dyn ProcessProbe>,
        notifier: Arc<dyn Notifier>,
        interventor: Arc<Interventor>,
        intervention_log: InterventionLog,
        config: Config,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            registry,
            process,
            notifier,
            interventor,
            intervention_log,
            config,
            restart_attempts: Arc::new(RwLock::new(HashMap::new())),
            state: Arc::new(RwLock::new(MonitorState::Stopped)),
            shutdown_tx,
            loop_handle: Arc::new(RwLock::new(None)),
            cancel: CancellationToken::new(),
        }
    }

    /// Start the periodic loop in the background. A no-op if already running.
    pub async fn start(self: Arc<Self>) {
        {
            let mut state = self.state.write().await;
            if *state == MonitorState::Running {
                return;
            }
            *state = MonitorState::Running;
        }

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let monitor = self.clone();
        let handle = tokio::spawn(async move {
            let interval_duration = Duration::from_millis(monitor.config.monitor.monitor_interval_ms);
            loop {
                let cycle_start = tokio::time::Instant::now();
                let report = monitor.run_once().await;
                info!(
                    projects_considered = report.projects_considered,
                    escalations = report.escalation_count,
                    "monitor cycle complete"
                );

                let elapsed = cycle_start.elapsed();
                let remaining = interval_duration.saturating_sub(elapsed);

                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("monitor received shutdown signal, stopping");
                        break;
                    }
                    () = tokio::time::sleep(remaining) => {}
                }
            }
        });

        *self.loop_handle.write().await = Some(handle);
    }

    /// Signal the background loop to stop and wait for it to exit.
    pub async fn stop(&self) {
        {
            let mut state = self.state.write().await;
            if *state == MonitorState::Stopped {
                return;
            }
            *state = MonitorState::Stopped;
        }

        let _ = self.shutdown_tx.send(());
        self.cancel.cancel();

        if let Some(handle) = self.loop_handle.write().await.take() {
            let abort_handle = handle.abort_handle();
            match tokio::time::timeout(SHUTDOWN_GRACE, handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = ?e, "monitor loop task panicked during shutdown"),
                Err(_) => {
                    warn!("monitor loop did not stop within the shutdown grace period, aborting");
                    abort_handle.abort();
                }
            }
        }
    }

    /// Run exactly one cycle over every registered project, sequentially.
    pub async fn run_once(&self) -> CycleReport {
        let mut report = CycleReport::default();

        let registry = match self.registry.read() {
            Ok(r) => r,
            Err(e) => {
                error!(error = %e, "cycle aborted: registry unreadable");
                return report;
            }
        };

        let projects: Vec<_> = registry
            .projects
            .values()
            .filter(|p| p.status == crate::domain::models::ProjectStatus::Running)
            .cloned()
            .collect();
        report.projects_considered = projects.len() as u32;

        for project in projects {
            self.process_project(&project, &mut report).await;
        }

        report
    }

    async fn process_project(&self, project: &crate::domain::models::Project, report: &mut CycleReport) {
        let now = chrono::Utc::now();
        let state = project_state::read_state(&project.path);
        let pid_alive = project.orchestrator_pid.is_some_and(|pid| self.process.is_alive(pid));
        let output_tail = project_state::read_output_tail(&project.path);

        let Some(classification) =
            classifier::classify(project, now, self.config.monitor.heartbeat_stale_ms, &state, pid_alive, output_tail.as_deref())
        else {
            return;
        };

        let attempts_so_far = {
            let attempts = self.restart_attempts.read().await;
            *attempts.get(&(project.name.clone(), classification.stall_type)).unwrap_or(&0)
        };

        let action = recovery_planner::plan(&classification, attempts_so_far, self.config.monitor.max_restart_attempts);

        match action.action_type {
            RecoveryActionType::Restart => self.dispatch_restart(project, &classification.stall_type, false, report).await,
            RecoveryActionType::RestartWithPreamble => {
                self.dispatch_restart(project, &classification.stall_type, true, report).await;
            }
            RecoveryActionType::Diagnose => self.dispatch_diagnose(project, &classification, report).await,
            RecoveryActionType::Escalate => {
                self.dispatch_escalate(project, &classification.stall_type, &action.detail, report).await;
            }
        }
    }

    async fn dispatch_restart(
        &self,
        project: &crate::domain::models::Project,
        stall_type: &StallType,
        with_preamble: bool,
        report: &mut CycleReport,
    ) {
        if let Some(pid) = project.orchestrator_pid {
            if self.process.is_alive(pid) {
                if let Err(e) = self.process.terminate(pid, TERMINATE_TIMEOUT).await {
                    warn!(project = %project.name, pid, error = %e, "failed to terminate stale orchestrator before restart");
                }
            }
        }

        let action_label = if with_preamble { "restart_with_preamble" } else { "restart" };

        match self.process.spawn_orchestrator(&project.path, with_preamble).await {
            Ok(new_pid) => {
                let update = self.registry.update(|r| {
                    if let Some(p) = r.find_by_name_mut(&project.name) {
                        p.orchestrator_pid = Some(new_pid);
                        p.heartbeat = chrono::Utc::now();
                        p.status = crate::domain::models::ProjectStatus::Running;
                        p.cycle_metadata.last_cycle_at = Some(chrono::Utc::now());
                        p.cycle_metadata.last_action = Some(action_label.to_string());
                        Ok(())
                    } else {
                        Err(crate::domain::errors::RegistryError::ProjectNotFound(project.name.clone()))
                    }
                });

                let outcome = match update {
                    Ok(_) => format!("restarted orchestrator (pid={new_pid})"),
                    Err(e) => format!("restarted orchestrator (pid={new_pid}) but failed to update registry: {e}"),
                };

                self.bump_attempt_count(project, *stall_type).await;
                self.log(project, Some(*stall_type), action_label, &outcome, None, None, None, Vec::new(), None);
                report.actions_taken.push((project.name.clone(), action_label.to_string()));
            }
            Err(e) => {
                warn!(project = %project.name, error = %e, "failed to spawn replacement orchestrator");
                self.log(project, Some(*stall_type), action_label, &format!("restart failed: {e}"), None, None, None, Vec::new(), None);
                report.actions_taken.push((project.name.clone(), format!("{action_label}_failed")));
            }
        }
    }

    async fn dispatch_diagnose(
        &self,
        project: &crate::domain::models::Project,
        classification: &crate::domain::models::StallClassification,
        report: &mut CycleReport,
    ) {
        let result = self.interventor.intervene(project, classification, self.cancel.clone()).await;

        let action = if result.success { "diagnose_fixed" } else if result.escalated { "diagnose_escalated" } else { "diagnose" };
        let root_cause = result.diagnosis.as_ref().map(|d| d.root_cause.clone());
        let fix_file = result.hotfix.as_ref().and_then(|h| h.file_modified.clone());
        let cost = {
            let diagnosis_cost = result.diagnosis.as_ref().map_or(0.0, |d| d.cost_usd);
            let hotfix_cost = result.hotfix.as_ref().map_or(0.0, |h| h.cost_usd);
            Some(diagnosis_cost + hotfix_cost)
        };

        self.log(
            project,
            Some(classification.stall_type),
            action,
            &result.detail,
            root_cause,
            fix_file,
            cost,
            result.memory_ids_consulted.clone(),
            result.memory_id_written.clone(),
        );
        report.actions_taken.push((project.name.clone(), action.to_string()));

        if result.escalated {
            report.escalation_count += 1;
            let message = format!("Escalation for `{}`: {}", project.name, result.detail);
            if let Err(e) = self.notifier.notify(&message).await {
                warn!(project = %project.name, error = %e, "telegram escalation notification failed");
            }
        }

        if let Some(propagation) = &result.propagation {
            if propagation.failed_count() > 0 {
                warn!(project = %project.name, failed = propagation.failed_count(), "propagation had failures this cycle");
            }
        }
    }

    async fn dispatch_escalate(
        &self,
        project: &crate::domain::models::Project,
        stall_type: &StallType,
        detail: &str,
        report: &mut CycleReport,
    ) {
        let message = format!(
            "Escalation for `{}` ({:?}): {}",
            project.name, stall_type, detail
        );
        if let Err(e) = self.notifier.notify(&message).await {
            warn!(project = %project.name, error = %e, "telegram escalation notification failed");
        }

        let state = project_state::read_state(&project.path);
        if let Some(failure) = state.latest_pending_failure() {
            if let Err(e) =
                project_state::resolve_failure(&project.path, &failure.command, failure.phase, crate::domain::models::Resolution::Escalated)
            {
                warn!(project = %project.name, error = %e, "failed to mark failure entry escalated");
            }
        }

        report.escalation_count += 1;
        self.log(project, Some(*stall_type), "escalate", detail, None, None, None, Vec::new(), None);
        report.actions_taken.push((project.name.clone(), "escalate".to_string()));
    }

    async fn bump_attempt_count(&self, project: &crate::domain::models::Project, stall_type: StallType) {
        let mut attempts = self.restart_attempts.write().await;
        *attempts.entry((project.name.clone(), stall_type)).or_insert(0) += 1;
    }

    #[allow(clippy::too_many_arguments)]
    fn log(
        &self,
        project: &crate::domain::models::Project,
        stall_type: Option<StallType>,
        action: &str,
        outcome: &str,
        diagnostic_root_cause: Option<String>,
        fix_file: Option<String>,
        cost_usd: Option<f64>,
        memory_ids_consulted: Vec<String>,
        memory_id_written: Option<String>,
    ) {
        let entry = InterventionLogEntry {
            timestamp: chrono::Utc::now(),
            project: project.name.clone(),
            stall_type,
            action: action.to_string(),
            outcome: outcome.to_string(),
            diagnostic_root_cause,
            fix_file,
            cost_usd,
            memory_ids_consulted,
            memory_id_written,
        };
        if let Err(e) = self.intervention_log.append(&entry) {
            warn!(project = %project.name, error = %e, "failed to append intervention log entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_report_had_escalations_reflects_count() {
        let mut report = CycleReport::default();
        assert!(!report.had_escalations());
        report.escalation_count = 1;
        assert!(report.had_escalations());
    }
}
