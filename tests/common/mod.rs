//! Shared test doubles for the supervisor's integration tests: a fake
//! process probe (no real subprocesses), a recording notifier, a
//! scripted AI driver, an in-memory fix-memory double, and a
//! configurable validator — plus small filesystem helpers for building
//! a project directory with a `.agents/manifest.yaml` state file.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use piv_supervisor::domain::errors::{AiDriverError, MemoryError, NotifierError, ProcessError};
use piv_supervisor::domain::models::{DiagnosticResult, FixRecord, FixRecordHit, HotFixResult};
use piv_supervisor::domain::ports::{
    AiDriver, DiagnosisRequest, FixMemory, FixRequest, Notifier, ProcessProbe, ValidationOutcome, Validator,
};

/// Records every pid it is told is alive/dead and every spawn/terminate
/// call, so a test can assert dispatch behavior without touching the OS.
pub struct FakeProcessProbe {
    alive_pids: Mutex<Vec<i32>>,
    next_pid: AtomicI32,
    pub spawn_calls: Mutex<Vec<(String, bool)>>,
    pub terminate_calls: Mutex<Vec<i32>>,
    pub fail_spawn: std::sync::atomic::AtomicBool,
}

impl FakeProcessProbe {
    #[must_use]
    pub fn new() -> Self {
        Self {
            alive_pids: Mutex::new(Vec::new()),
            next_pid: AtomicI32::new(10_000),
            spawn_calls: Mutex::new(Vec::new()),
            terminate_calls: Mutex::new(Vec::new()),
            fail_spawn: std::sync::atomic::AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn with_alive_pid(self, pid: i32) -> Self {
        self.alive_pids.lock().unwrap().push(pid);
        self
    }
}

#[async_trait]
impl ProcessProbe for FakeProcessProbe {
    fn is_alive(&self, pid: i32) -> bool {
        self.alive_pids.lock().unwrap().contains(&pid)
    }

    async fn terminate(&self, pid: i32, _timeout: Duration) -> Result<(), ProcessError> {
        self.terminate_calls.lock().unwrap().push(pid);
        self.alive_pids.lock().unwrap().retain(|p| *p != pid);
        Ok(())
    }

    async fn spawn_orchestrator(&self, project_path: &str, with_preamble: bool) -> Result<i32, ProcessError> {
        self.spawn_calls.lock().unwrap().push((project_path.to_string(), with_preamble));
        if self.fail_spawn.load(Ordering::SeqCst) {
            return Err(ProcessError::SpawnFailed("fake spawn failure".to_string()));
        }
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);
        self.alive_pids.lock().unwrap().push(pid);
        Ok(pid)
    }
}

/// Records every message it is asked to send; never actually reaches a
/// network.
#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &str) -> Result<(), NotifierError> {
        self.messages.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

/// Scripted `AiDriver`: each call to `diagnose`/`fix` pops the next
/// queued result (or error) rather than spawning a real `claude` CLI.
pub struct ScriptedAiDriver {
    diagnoses: Mutex<VecDeque<Result<DiagnosticResult, AiDriverError>>>,
    fixes: Mutex<VecDeque<Result<HotFixResult, AiDriverError>>>,
}

impl ScriptedAiDriver {
    #[must_use]
    pub fn new() -> Self {
        Self { diagnoses: Mutex::new(VecDeque::new()), fixes: Mutex::new(VecDeque::new()) }
    }

    #[must_use]
    pub fn with_diagnosis(self, result: DiagnosticResult) -> Self {
        self.diagnoses.lock().unwrap().push_back(Ok(result));
        self
    }

    #[must_use]
    pub fn with_fix(self, result: HotFixResult) -> Self {
        self.fixes.lock().unwrap().push_back(Ok(result));
        self
    }
}

#[async_trait]
impl AiDriver for ScriptedAiDriver {
    async fn diagnose(&self, _request: DiagnosisRequest) -> Result<DiagnosticResult, AiDriverError> {
        self.diagnoses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AiDriverError::MalformedOutput("no scripted diagnosis queued".to_string())))
    }

    async fn fix(&self, _request: FixRequest, _diagnosis: &DiagnosticResult) -> Result<HotFixResult, AiDriverError> {
        self.fixes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AiDriverError::MalformedOutput("no scripted fix queued".to_string())))
    }
}

/// In-memory `FixMemory` double. Always empty search results unless a
/// test installs some; records every stored record.
#[derive(Default)]
pub struct FakeFixMemory {
    pub stored: Mutex<Vec<FixRecord>>,
    pub fail: std::sync::atomic::AtomicBool,
}

impl FakeFixMemory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FixMemory for FakeFixMemory {
    async fn search(
        &self,
        _container_tag: &str,
        _query: &str,
        _limit: u32,
        _category: Option<&str>,
        _min_score: Option<f64>,
    ) -> Result<Vec<FixRecordHit>, MemoryError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MemoryError::RequestFailed("fake memory outage".to_string()));
        }
        Ok(Vec::new())
    }

    async fn store(&self, record: FixRecord) -> Result<(), MemoryError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MemoryError::RequestFailed("fake memory outage".to_string()));
        }
        self.stored.lock().unwrap().push(record);
        Ok(())
    }
}

/// Scripted validator: returns a fixed pass/fail outcome without running
/// a real subprocess.
pub struct FakeValidator {
    pub outcome: ValidationOutcome,
}

impl FakeValidator {
    #[must_use]
    pub fn passing() -> Self {
        Self { outcome: ValidationOutcome { passed: true, output: "all checks passed".to_string() } }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self { outcome: ValidationOutcome { passed: false, output: "cargo test: 1 failed".to_string() } }
    }
}

#[async_trait]
impl Validator for FakeValidator {
    async fn validate(
        &self,
        _project_path: &str,
        _commands: &[String],
        _timeout: Duration,
    ) -> Result<ValidationOutcome, ProcessError> {
        Ok(ValidationOutcome { passed: self.outcome.passed, output: self.outcome.output.clone() })
    }
}

/// Writes `<project_dir>/.agents/manifest.yaml` with a single failure
/// entry, returning the directory for further manipulation.
pub fn write_pending_failure(project_dir: &Path, command: &str, phase: i64, category: &str, details: &str, timestamp: DateTime<Utc>) {
    let agents_dir = project_dir.join(".agents");
    std::fs::create_dir_all(&agents_dir).unwrap();
    let yaml = format!(
        "failures:\n  - command: \"{command}\"\n    phase: {phase}\n    errorCategory: {category}\n    errorDetails: \"{details}\"\n    retryCount: 0\n    maxRetries: 3\n    resolution: pending\n    timestamp: \"{}\"\n",
        timestamp.to_rfc3339(),
    );
    std::fs::write(agents_dir.join("manifest.yaml"), yaml).unwrap();
}

/// Writes `<project_dir>/.agents/session-output.log` with `tail` as its
/// entire (small) contents.
pub fn write_output_log(project_dir: &Path, tail: &str) {
    let agents_dir = project_dir.join(".agents");
    std::fs::create_dir_all(&agents_dir).unwrap();
    std::fs::write(agents_dir.join("session-output.log"), tail).unwrap();
}

/// Reads back the `resolution` field of the single failure entry written
/// by `write_pending_failure`, for asserting post-cycle state.
pub fn read_resolution(project_dir: &Path) -> String {
    let contents = std::fs::read_to_string(project_dir.join(".agents/manifest.yaml")).unwrap();
    let value: serde_yaml::Value = serde_yaml::from_str(&contents).unwrap();
    value["failures"][0]["resolution"].as_str().unwrap().to_string()
}
