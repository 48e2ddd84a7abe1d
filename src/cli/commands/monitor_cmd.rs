//! Implementation of the `piv monitor` / `piv monitor --once` commands
//! (spec §4.2, §5 cancellation semantics, §6 exit codes).

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::config::PathsConfig;
use crate::infrastructure::config::expand_tilde;
use crate::services::{CycleReport, Monitor};

#[derive(serde::Serialize)]
#[serde(transparent)]
struct CycleReportOutput(CycleReport);

impl CommandOutput for CycleReportOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!("Considered {} project(s).", self.0.projects_considered)];
        if self.0.actions_taken.is_empty() {
            lines.push("No actions taken.".to_string());
        } else {
            lines.push("Actions:".to_string());
            for (project, action) in &self.0.actions_taken {
                lines.push(format!("  {project}: {action}"));
            }
        }
        if self.0.escalation_count > 0 {
            lines.push(format!("{} escalation(s) sent.", self.0.escalation_count));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.0).unwrap_or_default()
    }
}

/// Runs the monitor according to `once`, returning the process exit code
/// spec §6 documents for `monitor`/`monitor --once`.
pub async fn execute(monitor: Arc<Monitor>, once: bool, paths: &PathsConfig, json_mode: bool) -> Result<i32> {
    if once {
        let report = monitor.run_once().await;
        let had_escalations = report.had_escalations();
        output(&CycleReportOutput(report), json_mode);
        return Ok(if had_escalations { 3 } else { 0 });
    }

    let pid_path = expand_tilde(&paths.pid_file_path);
    write_pid_file(&pid_path)?;

    monitor.clone().start().await;
    info!("monitor loop started");

    let mut sigterm = signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("failed to install SIGINT handler")?;

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }

    monitor.stop().await;
    remove_pid_file(&pid_path);
    info!("monitor loop stopped cleanly");

    Ok(0)
}

fn write_pid_file(pid_path: &Path) -> Result<()> {
    if let Some(parent) = pid_path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(pid_path, std::process::id().to_string()).with_context(|| format!("failed to write pid file {}", pid_path.display()))
}

fn remove_pid_file(pid_path: &Path) {
    if let Err(e) = std::fs::remove_file(pid_path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(error = %e, path = %pid_path.display(), "failed to remove pid file on shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_and_remove_pid_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let pid_path = dir.path().join("nested/supervisor.pid");

        write_pid_file(&pid_path).unwrap();
        let contents = std::fs::read_to_string(&pid_path).unwrap();
        assert_eq!(contents, std::process::id().to_string());

        remove_pid_file(&pid_path);
        assert!(!pid_path.exists());
    }

    #[test]
    fn remove_pid_file_on_missing_file_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        remove_pid_file(&dir.path().join("never-written.pid"));
    }
}
