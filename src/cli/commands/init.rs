//! Implementation of the `piv init` command (spec §4.6).

use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::config::Config;
use crate::domain::models::project::{CycleMetadata, Project, ProjectStatus};
use crate::infrastructure::framework_version;
use crate::infrastructure::registry_store::RegistryStore;

/// Files and directories never copied from the framework source tree:
/// version control metadata and the project's own state.
const EXCLUDED_ENTRIES: &[&str] = &[".git", ".agents"];

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub initialized_path: PathBuf,
    pub project_name: String,
    pub framework_version: String,
    pub assets_copied: usize,
    pub already_registered: bool,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.message.clone()];
        lines.push(format!("Project: {}", self.project_name));
        lines.push(format!("Path: {}", self.initialized_path.display()));
        lines.push(format!("Framework version: {}", self.framework_version));
        if self.assets_copied > 0 {
            lines.push(format!("Copied {} framework asset file(s)", self.assets_copied));
        }
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Outcome used by `main` to pick the exit code spec §6 documents.
pub enum InitExit {
    Success(InitOutput),
    PathConflict(String),
}

#[allow(clippy::too_many_arguments)]
pub async fn execute(
    path: PathBuf,
    name: Option<String>,
    from: Option<String>,
    force: bool,
    config: &Config,
    registry: &RegistryStore,
    json_mode: bool,
) -> Result<InitExit> {
    let target_path = if path.is_absolute() { path } else { std::env::current_dir().context("failed to get current directory")?.join(path) };

    let project_name = name.unwrap_or_else(|| {
        target_path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_else(|| "unnamed-project".to_string())
    });

    let already_registered = registry.read().context("failed to read registry")?.find_by_path(&target_path.to_string_lossy()).is_some();

    let non_empty = target_path.exists() && fs::metadata(&target_path).await.is_ok() && dir_has_entries(&target_path).await?;
    if non_empty && !force && !already_registered {
        let message = format!("{} already exists and is non-empty; pass --force to overwrite", target_path.display());
        return Ok(InitExit::PathConflict(message));
    }

    fs::create_dir_all(&target_path).await.with_context(|| format!("failed to create {}", target_path.display()))?;

    let framework_source_dir = from.or_else(|| config.interventor.framework_source_dir.clone());
    let copied_assets = match &framework_source_dir {
        Some(source) => copy_framework_assets(Path::new(source), &target_path).await?,
        None => Vec::new(),
    };
    let assets_copied = copied_assets.len();

    let agents_dir = target_path.join(".agents");
    if !agents_dir.exists() {
        fs::create_dir_all(&agents_dir).await.context("failed to create .agents directory")?;
    }
    let manifest_path = agents_dir.join("manifest.yaml");
    if !manifest_path.exists() {
        let empty_state = crate::domain::models::ProjectState::default();
        let yaml = serde_yaml::to_string(&empty_state).context("failed to serialize empty project state")?;
        fs::write(&manifest_path, yaml).await.context("failed to write manifest skeleton")?;
    }

    let framework_ver = match &framework_source_dir {
        Some(source) => framework_version::compute(source, &copied_assets).await,
        None => "unversioned".to_string(),
    };

    registry
        .update(|r| {
            if let Some(existing) = r.find_by_name_mut(&project_name) {
                existing.piv_commands_version = framework_ver.clone();
                existing.path = target_path.to_string_lossy().to_string();
            } else {
                r.register(Project {
                    name: project_name.clone(),
                    path: target_path.to_string_lossy().to_string(),
                    status: ProjectStatus::Idle,
                    heartbeat: chrono::Utc::now(),
                    current_phase: None,
                    last_completed_phase: None,
                    piv_commands_version: framework_ver.clone(),
                    orchestrator_pid: None,
                    registered_at: chrono::Utc::now(),
                    cycle_metadata: CycleMetadata::default(),
                });
            }
            Ok(())
        })
        .context("failed to update registry")?;

    let message = if already_registered {
        "Project assets updated and registry bumped to the latest framework version.".to_string()
    } else {
        "Project initialized and registered.".to_string()
    };

    let result = InitOutput {
        success: true,
        message,
        initialized_path: target_path,
        project_name,
        framework_version: framework_ver,
        assets_copied,
        already_registered,
    };

    output(&result, json_mode);
    Ok(InitExit::Success(result))
}

async fn dir_has_entries(path: &Path) -> Result<bool> {
    let mut entries = fs::read_dir(path).await.with_context(|| format!("failed to read {}", path.display()))?;
    Ok(entries.next_entry().await?.is_some())
}

/// Copies every non-excluded entry from `source` into `target`, returning
/// the relative path of each file copied (used afterward to compute a
/// content hash when `source` isn't a git repo).
async fn copy_framework_assets(source: &Path, target: &Path) -> Result<Vec<String>> {
    if !source.exists() {
        bail!("framework source directory {} does not exist", source.display());
    }
    let mut copied = Vec::new();
    copy_recursive(source, target, Path::new(""), &mut copied).await?;
    Ok(copied)
}

fn copy_recursive<'a>(
    source: &'a Path,
    target: &'a Path,
    relative: &'a Path,
    copied: &'a mut Vec<String>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + 'a>> {
    Box::pin(async move {
        let mut entries = fs::read_dir(source).await.with_context(|| format!("failed to read {}", source.display()))?;

        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            if EXCLUDED_ENTRIES.iter().any(|excluded| file_name.to_string_lossy() == *excluded) {
                continue;
            }

            let entry_path = entry.path();
            let dest_path = target.join(&file_name);
            let entry_relative = relative.join(&file_name);

            if entry_path.is_dir() {
                fs::create_dir_all(&dest_path).await?;
                copy_recursive(&entry_path, &dest_path, &entry_relative, copied).await?;
            } else {
                if let Some(parent) = dest_path.parent() {
                    fs::create_dir_all(parent).await?;
                }
                fs::copy(&entry_path, &dest_path).await?;
                copied.push(entry_relative.to_string_lossy().to_string());
            }
        }

        Ok(())
    })
}
