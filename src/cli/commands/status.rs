//! Implementation of the `piv status` command: prints the registry's
//! contents as a table (spec §6).

use anyhow::{Context, Result};
use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::project::ProjectStatus;
use crate::infrastructure::registry_store::RegistryStore;

#[derive(Debug, serde::Serialize)]
pub struct StatusOutput {
    pub projects: Vec<ProjectRow>,
}

#[derive(Debug, serde::Serialize)]
pub struct ProjectRow {
    pub name: String,
    pub path: String,
    pub status: String,
    pub heartbeat: String,
    pub current_phase: Option<i64>,
    pub piv_commands_version: String,
    pub orchestrator_pid: Option<i32>,
}

impl CommandOutput for StatusOutput {
    fn to_human(&self) -> String {
        if self.projects.is_empty() {
            return "No projects registered.".to_string();
        }

        let mut table = Table::new();
        table.load_preset(presets::UTF8_FULL).set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Name").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
            Cell::new("Heartbeat").add_attribute(Attribute::Bold),
            Cell::new("Phase").add_attribute(Attribute::Bold),
            Cell::new("Version").add_attribute(Attribute::Bold),
            Cell::new("PID").add_attribute(Attribute::Bold),
        ]);

        for project in &self.projects {
            table.add_row(vec![
                Cell::new(&project.name),
                Cell::new(&project.status).fg(status_color(&project.status)),
                Cell::new(&project.heartbeat),
                Cell::new(project.current_phase.map_or_else(|| "-".to_string(), |p| p.to_string())),
                Cell::new(&project.piv_commands_version),
                Cell::new(project.orchestrator_pid.map_or_else(|| "-".to_string(), |p| p.to_string())),
            ]);
        }

        table.to_string()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

fn status_color(status: &str) -> Color {
    match status {
        "running" => Color::Green,
        "idle" => Color::Yellow,
        "failed" => Color::Red,
        _ => Color::Grey,
    }
}

pub fn execute(registry: &RegistryStore, json_mode: bool) -> Result<()> {
    let registry = registry.read().context("registry unreadable")?;

    let projects = registry
        .projects
        .values()
        .map(|p| ProjectRow {
            name: p.name.clone(),
            path: p.path.clone(),
            status: status_label(p.status).to_string(),
            heartbeat: p.heartbeat.to_rfc3339(),
            current_phase: p.current_phase,
            piv_commands_version: p.piv_commands_version.clone(),
            orchestrator_pid: p.orchestrator_pid,
        })
        .collect();

    let result = StatusOutput { projects };
    output(&result, json_mode);
    Ok(())
}

const fn status_label(status: ProjectStatus) -> &'static str {
    match status {
        ProjectStatus::Running => "running",
        ProjectStatus::Idle => "idle",
        ProjectStatus::Complete => "complete",
        ProjectStatus::Failed => "failed",
    }
}
