//! End-to-end coverage of the monitor cycle against a registry and
//! project-local state files on a real (tempfile) filesystem, with every
//! external dependency (process probe, AI driver, memory, validator,
//! notifier) replaced by a fake from `tests/common`. Each test drives one
//! `Monitor::run_once()` pass and asserts the resulting registry/state/log
//! changes rather than inspecting internals.

mod common;

use std::sync::Arc;

use chrono::Utc;

use piv_supervisor::domain::models::diagnostic::BugLocation;
use piv_supervisor::domain::models::failure::ErrorCategory;
use piv_supervisor::domain::models::hotfix::HotFixResult;
use piv_supervisor::domain::models::project::{CycleMetadata, Project, ProjectStatus};
use piv_supervisor::domain::models::{Confidence, DiagnosticResult};
use piv_supervisor::infrastructure::intervention_log::InterventionLog;
use piv_supervisor::infrastructure::registry_store::RegistryStore;
use piv_supervisor::services::{Interventor, Monitor};

use common::{FakeFixMemory, FakeProcessProbe, FakeValidator, RecordingNotifier, ScriptedAiDriver};

fn base_project(dir: &std::path::Path, name: &str, heartbeat: chrono::DateTime<Utc>) -> Project {
    Project {
        name: name.to_string(),
        path: dir.to_str().unwrap().to_string(),
        status: ProjectStatus::Running,
        heartbeat,
        current_phase: Some(2),
        last_completed_phase: Some(1),
        piv_commands_version: "v1".to_string(),
        orchestrator_pid: Some(123),
        registered_at: Utc::now(),
        cycle_metadata: CycleMetadata::default(),
    }
}

fn diagnosis(bug_location: BugLocation, target_file: &str, estimated_lines: u32) -> DiagnosticResult {
    DiagnosticResult {
        bug_location,
        root_cause: "off by one in the phase counter".to_string(),
        target_file: Some(target_file.to_string()),
        line_range: Some((10, 12)),
        recommended_change: "fix the loop bound".to_string(),
        estimated_lines,
        confidence: Confidence::High,
        cost_usd: 0.10,
        ai_session_id: uuid::Uuid::nil(),
    }
}

struct Harness {
    registry: Arc<RegistryStore>,
    process: Arc<FakeProcessProbe>,
    notifier: Arc<RecordingNotifier>,
    monitor: Arc<Monitor>,
    _tmp: tempfile::TempDir,
}

fn build_harness(
    process: FakeProcessProbe,
    ai_driver: ScriptedAiDriver,
    memory: FakeFixMemory,
    validator: FakeValidator,
) -> Harness {
    let tmp = tempfile::tempdir().unwrap();
    let registry = Arc::new(RegistryStore::new(tmp.path().join("registry.yaml")));
    let process = Arc::new(process);
    let notifier = Arc::new(RecordingNotifier::new());
    let config = piv_supervisor::domain::models::config::Config::default();

    let interventor = Arc::new(Interventor::new(
        Arc::new(ai_driver),
        Arc::new(memory),
        Arc::new(validator),
        process.clone(),
        registry.clone(),
        config.interventor.clone(),
        config.memory.search_threshold,
        config.memory.search_limit,
    ));

    let intervention_log = InterventionLog::new(tmp.path().join("improvement-log.md"));
    let monitor = Arc::new(Monitor::new(registry.clone(), process.clone(), notifier.clone(), interventor, intervention_log, config));

    Harness { registry, process, notifier, monitor, _tmp: tmp }
}

/// S1: a healthy fleet (fresh heartbeats) produces no actions at all.
#[tokio::test]
async fn healthy_fleet_takes_no_action() {
    let project_dir = tempfile::tempdir().unwrap();
    let harness = build_harness(FakeProcessProbe::new(), ScriptedAiDriver::new(), FakeFixMemory::new(), FakeValidator::passing());

    harness
        .registry
        .update(|r| {
            r.register(base_project(project_dir.path(), "demo", Utc::now()));
            Ok(())
        })
        .unwrap();

    let report = harness.monitor.run_once().await;

    assert_eq!(report.projects_considered, 1);
    assert!(report.actions_taken.is_empty());
    assert_eq!(report.escalation_count, 0);
    assert!(harness.notifier.sent().is_empty());
}

/// S2: a crashed orchestrator (stale heartbeat, dead pid) is restarted and
/// the registry's pid/heartbeat/status are updated to reflect the new
/// process.
#[tokio::test]
async fn crashed_orchestrator_is_restarted() {
    let project_dir = tempfile::tempdir().unwrap();
    let stale = Utc::now() - chrono::Duration::milliseconds(900_001);
    let process = FakeProcessProbe::new();
    let harness = build_harness(process, ScriptedAiDriver::new(), FakeFixMemory::new(), FakeValidator::passing());

    harness
        .registry
        .update(|r| {
            r.register(base_project(project_dir.path(), "demo", stale));
            Ok(())
        })
        .unwrap();

    let report = harness.monitor.run_once().await;

    assert_eq!(report.actions_taken, vec![("demo".to_string(), "restart".to_string())]);
    assert_eq!(harness.process.spawn_calls.lock().unwrap().len(), 1);

    let registry = harness.registry.read().unwrap();
    let updated = registry.find_by_name("demo").unwrap();
    assert!(updated.orchestrator_pid.is_some());
    assert_eq!(updated.status, ProjectStatus::Running);
}

/// S3: a pending failure diagnosed as a framework bug, fixed, and
/// validated is recorded as `auto_fixed` in the project's own state file,
/// with no escalation raised.
#[tokio::test]
async fn cross_project_framework_bug_is_fixed_and_resolved() {
    let project_dir = tempfile::tempdir().unwrap();
    let stale = Utc::now() - chrono::Duration::milliseconds(900_001);

    common::write_pending_failure(project_dir.path(), "cargo test", 2, "test_failure", "assertion failed", Utc::now());

    // No `framework_source_dir` is configured, so this exercises fix+
    // validate+resolve without the propagation hop — covered separately
    // by `propagator.rs`'s own tempfile-backed tests.
    let ai = ScriptedAiDriver::new()
        .with_diagnosis(diagnosis(BugLocation::FrameworkBug, "src/lib.rs", 5))
        .with_fix(HotFixResult::accepted("src/lib.rs".to_string(), 5, 0.20, "all checks passed".to_string()));

    let process = FakeProcessProbe::new().with_alive_pid(123);
    let harness = build_harness(process, ai, FakeFixMemory::new(), FakeValidator::passing());

    harness
        .registry
        .update(|r| {
            r.register(base_project(project_dir.path(), "demo", stale));
            Ok(())
        })
        .unwrap();

    let report = harness.monitor.run_once().await;

    assert_eq!(report.escalation_count, 0);
    assert_eq!(common::read_resolution(project_dir.path()), "auto_fixed");
    assert!(harness.notifier.sent().is_empty());
}

/// S4: a session repeatedly waiting on a question (no pending failure,
/// live pid, interrogative output tail) is restarted with a preamble up
/// to `max_restart_attempts` times, then escalates via the notifier on
/// the attempt past the ceiling. Each cycle's restart refreshes the
/// registry heartbeat, so the test re-stales it before every call to
/// simulate the orchestrator never actually recovering.
#[tokio::test]
async fn agent_waiting_for_input_escalates_after_max_attempts() {
    let project_dir = tempfile::tempdir().unwrap();
    common::write_output_log(project_dir.path(), "Should I proceed with the migration?");

    let process = FakeProcessProbe::new().with_alive_pid(123);
    let harness = build_harness(process, ScriptedAiDriver::new(), FakeFixMemory::new(), FakeValidator::passing());
    let max_attempts = piv_supervisor::domain::models::config::Config::default().monitor.max_restart_attempts;

    harness
        .registry
        .update(|r| {
            let stale = Utc::now() - chrono::Duration::milliseconds(900_001);
            r.register(base_project(project_dir.path(), "demo", stale));
            Ok(())
        })
        .unwrap();

    for _ in 0..max_attempts {
        let report = harness.monitor.run_once().await;
        assert_eq!(report.actions_taken, vec![("demo".to_string(), "restart_with_preamble".to_string())]);
        assert_eq!(report.escalation_count, 0);

        harness
            .registry
            .update(|r| {
                let stale = Utc::now() - chrono::Duration::milliseconds(900_001);
                if let Some(p) = r.find_by_name_mut("demo") {
                    p.heartbeat = stale;
                }
                Ok(())
            })
            .unwrap();
    }

    let report = harness.monitor.run_once().await;

    assert_eq!(report.escalation_count, 1);
    assert_eq!(harness.notifier.sent().len(), 1);
    assert!(harness.notifier.sent()[0].contains("demo"));
}

/// S5: a fix session whose change fails independent validation is
/// reverted and the project's failure entry is marked `rolled_back`, with
/// an escalation raised.
#[tokio::test]
async fn fix_failing_validation_is_reverted_and_escalated() {
    let project_dir = tempfile::tempdir().unwrap();
    let stale = Utc::now() - chrono::Duration::milliseconds(900_001);
    common::write_pending_failure(project_dir.path(), "cargo test", 2, "test_failure", "assertion failed", Utc::now());

    let ai = ScriptedAiDriver::new()
        .with_diagnosis(diagnosis(BugLocation::ProjectBug, "src/lib.rs", 5))
        .with_fix(HotFixResult::accepted("src/lib.rs".to_string(), 5, 0.15, "session's own (untrusted) report".to_string()));
    let process = FakeProcessProbe::new().with_alive_pid(123);
    let harness = build_harness(process, ai, FakeFixMemory::new(), FakeValidator::failing());

    harness
        .registry
        .update(|r| {
            r.register(base_project(project_dir.path(), "demo", stale));
            Ok(())
        })
        .unwrap();

    let report = harness.monitor.run_once().await;

    assert_eq!(report.escalation_count, 1);
    assert_eq!(common::read_resolution(project_dir.path()), "rolled_back");
}

/// S6: a diagnosis that locates the root cause in credentials/auth/
/// environment is escalated without any fix session being attempted.
#[tokio::test]
async fn human_required_diagnosis_escalates_without_a_fix_attempt() {
    let project_dir = tempfile::tempdir().unwrap();
    let stale = Utc::now() - chrono::Duration::milliseconds(900_001);
    common::write_pending_failure(project_dir.path(), "cargo test", 2, "auth_failure", "401 unauthorized", Utc::now());

    let ai = ScriptedAiDriver::new().with_diagnosis(diagnosis(BugLocation::HumanRequired, "", 0));
    let process = FakeProcessProbe::new().with_alive_pid(123);
    let harness = build_harness(process, ai, FakeFixMemory::new(), FakeValidator::passing());

    harness
        .registry
        .update(|r| {
            r.register(base_project(project_dir.path(), "demo", stale));
            Ok(())
        })
        .unwrap();

    let report = harness.monitor.run_once().await;

    assert_eq!(report.escalation_count, 1);
    assert_eq!(common::read_resolution(project_dir.path()), "escalated");
}

/// Non-`running` projects are skipped entirely: no classification, no
/// dispatch, no log entry.
#[tokio::test]
async fn idle_and_complete_projects_are_not_considered() {
    let idle_dir = tempfile::tempdir().unwrap();
    let complete_dir = tempfile::tempdir().unwrap();
    let stale = Utc::now() - chrono::Duration::milliseconds(900_001);

    let harness = build_harness(FakeProcessProbe::new(), ScriptedAiDriver::new(), FakeFixMemory::new(), FakeValidator::passing());

    harness
        .registry
        .update(|r| {
            let mut idle = base_project(idle_dir.path(), "idle-one", stale);
            idle.status = ProjectStatus::Idle;
            r.register(idle);

            let mut complete = base_project(complete_dir.path(), "done-one", stale);
            complete.status = ProjectStatus::Complete;
            r.register(complete);
            Ok(())
        })
        .unwrap();

    let report = harness.monitor.run_once().await;

    assert_eq!(report.projects_considered, 0);
    assert!(report.actions_taken.is_empty());
}

/// A category absent from `ErrorCategory`'s explicit taxonomy round-trips
/// via `#[serde(other)]` as `Other`, a forward-compatibility detail worth
/// pinning at the integration level since the classifier/planner never
/// special-case it.
#[test]
fn unknown_error_category_deserializes_as_other() {
    let yaml = "command: \"cargo test\"\nphase: 1\nerrorCategory: some_future_category\nerrorDetails: \"x\"\nretryCount: 0\nmaxRetries: 3\nresolution: pending\ntimestamp: \"2026-01-01T00:00:00Z\"\n";
    let entry: piv_supervisor::domain::models::failure::FailureEntry = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(entry.error_category, ErrorCategory::Other);
}
