//! The Interventor: drives a read-only diagnosis AI session, decides
//! whether the result is worth a bounded write-capable fix session, runs
//! that fix, independently validates it, and on success (for a framework
//! bug) hands off to the Propagator. Everything about deciding *what* to
//! do lives here; the actual AI session mechanics live behind `AiDriver`,
//! the actual subprocess validation behind `Validator`.

use std::path::{Component, Path};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::domain::errors::AiDriverError;
use crate::domain::models::config::InterventorConfig;
use crate::domain::models::{
    BugLocation, Confidence, DiagnosticResult, ErrorCategory, FixRecord, HotFixResult, InterventionResult,
    MetadataValue, Project, Resolution, StallClassification,
};
use crate::domain::ports::{AiDriver, DiagnosisRequest, FixMemory, FixRequest, ProcessProbe, Validator};
use crate::infrastructure::project_state;
use crate::infrastructure::registry_store::RegistryStore;
use crate::infrastructure::framework_version;

use super::propagator::Propagator;

/// How far back a cross-project failure is still considered "recent"
/// for the framework-bug override rule.
const CROSS_PROJECT_WINDOW: ChronoDuration = ChronoDuration::hours(24);

/// First N characters of a failure's detail text used to build prompts
/// and memory queries.
const DETAIL_EXCERPT_CHARS: usize = 200;

pub struct Interventor {
    ai_driver: Arc<dyn AiDriver>,
    memory: Arc<dyn FixMemory>,
    validator: Arc<dyn Validator>,
    process: Arc<dyn ProcessProbe>,
    registry: Arc<RegistryStore>,
    config: InterventorConfig,
    memory_search_threshold: f64,
    memory_search_limit: u32,
}

impl Interventor {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ai_driver: Arc<dyn AiDriver>,
        memory: Arc<dyn FixMemory>,
        validator: Arc<dyn Validator>,
        process: Arc<dyn ProcessProbe>,
        registry: Arc<RegistryStore>,
        config: InterventorConfig,
        memory_search_threshold: f64,
        memory_search_limit: u32,
    ) -> Self {
        Self { ai_driver, memory, validator, process, registry, config, memory_search_threshold, memory_search_limit }
    }

    /// Drive diagnosis, and a fix if warranted, for `project`'s current
    /// `execution_error` classification. `cancel` is checked by the
    /// underlying AI sessions so a supervisor shutdown can interrupt an
    /// in-flight diagnosis or fix rather than block on it.
    pub async fn intervene(&self, project: &Project, classification: &StallClassification, cancel: CancellationToken) -> InterventionResult {
        let state = project_state::read_state(&project.path);
        let Some(failure) = state.latest_pending_failure() else {
            return InterventionResult::escalated_without_fix(None, "no pending failure entry found to diagnose");
        };
        let failure = failure.clone();

        let timeout = Duration::from_millis(self.config.intervention_timeout_ms);
        let detail_excerpt = failure.detail_excerpt(DETAIL_EXCERPT_CHARS);
        let category_str = category_label(&failure.error_category);

        let (prior_fixes, memory_ids) = self.recall_prior_fixes(&project.name, &category_str, &detail_excerpt).await;

        let diagnosis_prompt =
            build_diagnosis_prompt(project, &failure.command, failure.phase, &detail_excerpt, &classification.detail, &prior_fixes);
        let diagnosis_request = DiagnosisRequest {
            project_path: project.path.clone(),
            prompt: diagnosis_prompt,
            budget_usd: self.config.diagnosis_budget_usd,
            max_turns: self.config.diagnosis_max_turns,
            timeout,
            cancel: cancel.clone(),
        };

        let mut diagnosis = match self.ai_driver.diagnose(diagnosis_request).await {
            Ok(d) => d,
            Err(e) => {
                let mut result = self.escalate_diagnosis_failure(project, &failure, &e);
                result.memory_ids_consulted = memory_ids;
                return result;
            }
        };

        self.apply_bug_location_overrides(project, &failure, &mut diagnosis).await;

        if matches!(diagnosis.bug_location, BugLocation::HumanRequired) {
            self.resolve(project, &failure, Resolution::Escalated);
            let mut result = InterventionResult::escalated_without_fix(
                Some(diagnosis),
                "escalated: human_required (credentials/auth/environment)",
            );
            result.memory_ids_consulted = memory_ids;
            return result;
        }

        if !diagnosis.is_fixable_shape() {
            self.resolve(project, &failure, Resolution::Escalated);
            let mut result = InterventionResult::escalated_without_fix(
                Some(diagnosis),
                "diagnosis did not produce a precise, single-file, bounded change",
            );
            result.memory_ids_consulted = memory_ids;
            return result;
        }

        let mut result = self.run_fix_and_validate(project, &failure, diagnosis, cancel).await;
        result.memory_ids_consulted = memory_ids;
        result
    }

    async fn run_fix_and_validate(
        &self,
        project: &Project,
        failure: &crate::domain::models::FailureEntry,
        diagnosis: DiagnosticResult,
        cancel: CancellationToken,
    ) -> InterventionResult {
        let timeout = Duration::from_millis(self.config.intervention_timeout_ms);
        let fix_prompt = build_fix_prompt();
        let fix_request = FixRequest {
            project_path: project.path.clone(),
            prompt: fix_prompt,
            budget_usd: self.config.fix_budget_usd,
            max_turns: self.config.fix_max_turns,
            timeout,
            cancel,
        };

        let raw_hotfix = match self.ai_driver.fix(fix_request, &diagnosis).await {
            Ok(h) => h,
            Err(e) => return self.escalate_fix_failure(project, failure, diagnosis, &e).await,
        };

        if !raw_hotfix.meets_size_limits() {
            Self::revert_working_copy(&project.path, raw_hotfix.file_modified.as_deref()).await;
            self.resolve(project, failure, Resolution::RolledBack);
            let hotfix = HotFixResult::reverted(
                raw_hotfix.file_modified.clone().unwrap_or_default(),
                raw_hotfix.lines_changed,
                raw_hotfix.cost_usd,
                "fix exceeded size limits".to_string(),
            );
            return InterventionResult::escalated_after_failed_fix(diagnosis, hotfix, "fix exceeded the 1 file / 30 line size limit, reverted");
        }

        let outcome = self.validator.validate(&project.path, &self.config.validation_commands, timeout).await;
        let (passed, validation_output) = match outcome {
            Ok(outcome) => (outcome.passed, outcome.output),
            Err(e) => (false, e.to_string()),
        };

        let file = raw_hotfix.file_modified.clone().unwrap_or_default();

        if !passed {
            Self::revert_working_copy(&project.path, Some(&file)).await;
            self.resolve(project, failure, Resolution::RolledBack);
            let hotfix = HotFixResult::reverted(file, raw_hotfix.lines_changed, raw_hotfix.cost_usd, validation_output);
            return InterventionResult::escalated_after_failed_fix(diagnosis, hotfix, "fix failed validation, reverted");
        }

        let hotfix = HotFixResult::accepted(file.clone(), raw_hotfix.lines_changed, raw_hotfix.cost_usd, validation_output);
        self.resolve(project, failure, Resolution::AutoFixed);

        let mut result = InterventionResult::fixed(diagnosis.clone(), hotfix.clone(), format!("fixed {file} ({} lines)", hotfix.lines_changed));

        if matches!(diagnosis.bug_location, BugLocation::FrameworkBug) {
            if let Some(framework_dir) = self.config.framework_source_dir.clone() {
                let propagator = Propagator::new(self.registry.clone(), self.process.clone());
                let new_version = framework_version::compute(&framework_dir, std::slice::from_ref(&file)).await;
                let propagation = propagator.propagate(&framework_dir, &[file.clone()], &new_version).await;
                info!(project = %project.name, propagated = propagation.updated_count(), "propagated framework fix");
                result.propagation = Some(propagation);
            }
        }

        match self.store_fix_record(project, failure, &diagnosis, &file).await {
            Ok(id) => result.memory_id_written = Some(id),
            Err(e) => warn!(project = %project.name, error = %e, "failed to store fix record in memory, continuing"),
        }

        result
    }

    /// Returns the prior fixes' text (for the diagnosis prompt) alongside
    /// the memory record ids consulted to produce them (for the
    /// intervention log). The scoped query is narrowed to this project's
    /// error category server-side; the cross-project query is narrowed by
    /// `memory_search_threshold`, both server-side (via `min_score`) and,
    /// as a belt-and-braces check, again here in case the service doesn't
    /// honor it.
    async fn recall_prior_fixes(&self, project_name: &str, category: &str, detail_excerpt: &str) -> (Vec<String>, Vec<String>) {
        let query = format!("{category}: {detail_excerpt}");

        let scoped = self
            .memory
            .search(project_name, &query, self.memory_search_limit, Some(category), None)
            .await
            .unwrap_or_default();
        let unscoped = self
            .memory
            .search("", &query, self.memory_search_limit, None, Some(self.memory_search_threshold))
            .await
            .unwrap_or_default();

        let hits: Vec<_> =
            scoped.into_iter().chain(unscoped.into_iter().filter(|hit| hit.score >= self.memory_search_threshold)).collect();

        let ids = hits.iter().map(|hit| hit.id.clone()).collect();
        let contents = hits.into_iter().map(|hit| hit.content).collect();
        (contents, ids)
    }

    /// Re-checks the AI session's reported bug location: first against the
    /// containment invariant (the target file must actually live under the
    /// project or the canonical framework directory), then against the
    /// cross-project recurrence rule, overriding to `FrameworkBug` when
    /// warranted regardless of what the session itself said.
    async fn apply_bug_location_overrides(
        &self,
        project: &Project,
        failure: &crate::domain::models::FailureEntry,
        diagnosis: &mut DiagnosticResult,
    ) {
        if let Some(target_file) = diagnosis.target_file.clone() {
            if !self.target_file_is_contained(project, &target_file) {
                diagnosis.bug_location = BugLocation::HumanRequired;
                diagnosis.confidence = Confidence::High;
                return;
            }
        }

        if matches!(diagnosis.bug_location, BugLocation::FrameworkBug | BugLocation::HumanRequired) {
            return;
        }

        if self.is_cross_project_recurrence(project, failure).await {
            diagnosis.bug_location = BugLocation::FrameworkBug;
            diagnosis.confidence = Confidence::High;
        }
    }

    /// True if `target_file` resolves inside `project.path` or the
    /// configured `framework_source_dir`. A diagnosis session cannot be
    /// trusted to keep its own claimed target file inside either root, so
    /// this is re-checked independently before a fix session is ever let
    /// near it.
    fn target_file_is_contained(&self, project: &Project, target_file: &str) -> bool {
        let roots = std::iter::once(project.path.as_str()).chain(self.config.framework_source_dir.as_deref());
        roots.into_iter().any(|root| path_is_contained(root, target_file))
    }

    /// True if the same (error category, phase) pair has a pending
    /// failure in at least one *other* registered project within the
    /// last 24 hours, making this one of at least two affected projects.
    async fn is_cross_project_recurrence(&self, project: &Project, failure: &crate::domain::models::FailureEntry) -> bool {
        let Ok(registry) = self.registry.read() else {
            return false;
        };

        let cutoff = Utc::now() - CROSS_PROJECT_WINDOW;
        let mut affected = 1;

        for other in registry.projects.values() {
            if other.name == project.name {
                continue;
            }
            let other_state = project_state::read_state(&other.path);
            let matches = other_state.failures.iter().any(|f| {
                f.error_category == failure.error_category && f.phase == failure.phase && f.timestamp >= cutoff
            });
            if matches {
                affected += 1;
            }
        }

        affected >= 2
    }

    fn escalate_diagnosis_failure(
        &self,
        project: &Project,
        failure: &crate::domain::models::FailureEntry,
        error: &AiDriverError,
    ) -> InterventionResult {
        self.resolve(project, failure, Resolution::Escalated);
        InterventionResult::escalated_without_fix(None, format!("diagnosis session failed: {error}"))
    }

    async fn escalate_fix_failure(
        &self,
        project: &Project,
        failure: &crate::domain::models::FailureEntry,
        diagnosis: DiagnosticResult,
        error: &AiDriverError,
    ) -> InterventionResult {
        Self::revert_working_copy(&project.path, diagnosis.target_file.as_deref()).await;
        self.resolve(project, failure, Resolution::Escalated);
        let hotfix = HotFixResult::not_attempted(0.0);
        InterventionResult::escalated_after_failed_fix(diagnosis, hotfix, format!("fix session failed: {error}"))
    }

    fn resolve(&self, project: &Project, failure: &crate::domain::models::FailureEntry, resolution: Resolution) {
        if let Err(e) = project_state::resolve_failure(&project.path, &failure.command, failure.phase, resolution) {
            warn!(project = %project.name, error = %e, "failed to write back failure resolution");
        }
    }

    async fn store_fix_record(
        &self,
        project: &Project,
        failure: &crate::domain::models::FailureEntry,
        diagnosis: &DiagnosticResult,
        file: &str,
    ) -> Result<String, crate::domain::errors::MemoryError> {
        let category = category_label(&failure.error_category);
        let custom_id = FixRecord::custom_id_for(&project.name, file, &category);
        let content = format!(
            "## Error\n{}\n\n## Root cause\n{}\n\n## Fix\n{}\n",
            failure.error_details, diagnosis.root_cause, diagnosis.recommended_change
        );
        let mut metadata = std::collections::HashMap::new();
        metadata.insert("error_category".to_string(), MetadataValue::Text(category));
        metadata.insert("phase".to_string(), MetadataValue::Text(failure.phase.to_string()));
        metadata.insert("project".to_string(), MetadataValue::Text(project.name.clone()));
        metadata.insert("resolved".to_string(), MetadataValue::Bool(true));

        let record = FixRecord { custom_id: custom_id.clone(), container_tag: project.name.clone(), content, metadata };
        self.memory.store(record).await?;
        Ok(custom_id)
    }

    /// `git checkout -- <file>` inside the project, discarding the
    /// uncommitted fix-session change. Best-effort: a missing git repo or
    /// a failed checkout is logged, not propagated, since the caller has
    /// already decided to escalate regardless.
    async fn revert_working_copy(project_path: &str, file: Option<&str>) {
        let Some(file) = file else {
            return;
        };
        let result = Command::new("git").arg("checkout").arg("--").arg(file).current_dir(project_path).output().await;
        if let Err(e) = result {
            warn!(project_path, file, error = %e, "failed to revert working copy after failed fix");
        }
    }
}

/// True if `candidate` (resolved against `root` when relative) lies
/// inside `root`. Prefers `canonicalize` so symlinks and `..` segments
/// resolve correctly; falls back to a lexical check (rejecting any `..`
/// component outright) when either path doesn't exist on disk, which is
/// common in tests that never materialize the target file.
fn path_is_contained(root: &str, candidate: &str) -> bool {
    let root_path = Path::new(root);
    let candidate_path = Path::new(candidate);
    let joined = if candidate_path.is_absolute() { candidate_path.to_path_buf() } else { root_path.join(candidate_path) };

    if let (Ok(canon_root), Ok(canon_candidate)) = (std::fs::canonicalize(root_path), std::fs::canonicalize(&joined)) {
        return canon_candidate.starts_with(&canon_root);
    }

    if joined.components().any(|c| c == Component::ParentDir) {
        return false;
    }
    joined.starts_with(root_path)
}

fn category_label(category: &ErrorCategory) -> String {
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
    .to_string()
}

fn build_diagnosis_prompt(
    project: &Project,
    command: &str,
    phase: i64,
    detail_excerpt: &str,
    classifier_detail: &str,
    prior_fixes: &[String],
) -> String {
    let prior_block = if prior_fixes.is_empty() {
        "(no prior fixes found)".to_string()
    } else {
        prior_fixes.iter().enumerate().map(|(i, text)| format!("[{}] {text}", i + 1)).collect::<Vec<_>>().join("\n\n")
    };

    format!(
        "Project `{}` at `{}` has a pending failure at phase {phase} running `{command}` \
         (monitor classification: {classifier_detail}):\n{detail_excerpt}\n\n\
         Read the project-local state file at .agents/manifest.yaml and any referenced progress or validation \
         artifacts. Trace the most recent pending failure to a specific file and line. Do not modify anything.\n\n\
         Prior fixes (non-authoritative context, may be outdated):\n{prior_block}\n\n\
         Respond with a JSON object: bug_location (framework_bug|project_bug|human_required|ambiguous), \
         root_cause, target_file, line_range ([start, end] or null), recommended_change, estimated_lines, confidence (low|medium|high).",
        project.name, project.path,
    )
}

fn build_fix_prompt() -> String {
    "Apply the recommended change from the diagnosis above. Modify only the named target file. Do not exceed 30 \
     lines of added+removed diff. After editing, run the project's type-check and unit-test commands yourself to \
     sanity-check the change before finishing."
        .to_string()
}
