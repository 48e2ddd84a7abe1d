//! Reads a project-local state file and, best-effort, the tail of an
//! orchestrator's output log. The orchestrator is the sole writer of
//! everything in this file except one field: a completed intervention
//! resolves the pending Failure entry it acted on (`auto_fixed` /
//! `rolled_back` / `escalated`), so the supervisor is also the sole
//! writer of `resolution`. That single-field write uses the same
//! write-temp-then-rename idiom as the registry, scoped to this file
//! rather than the registry's lock, since the two files are never
//! touched by more than one supervisor cycle at a time.

use std::path::{Path, PathBuf};

use crate::domain::models::failure::{ProjectState, Resolution};

/// Canonical relative path of a project's state file, per spec.md §6.
pub const STATE_FILE_RELATIVE_PATH: &str = ".agents/manifest.yaml";

/// Canonical relative path of the orchestrator's running-session output
/// log, consulted only for the `agent_waiting_for_input` heuristic.
pub const OUTPUT_LOG_RELATIVE_PATH: &str = ".agents/session-output.log";

/// How many trailing bytes of the output log to read for the question
/// heuristic — enough for a few lines of text, not the whole transcript.
const OUTPUT_TAIL_BYTES: u64 = 4096;

/// Read `<project_path>/.agents/manifest.yaml`. A missing file is not an
/// error: it means the orchestrator has not recorded any failures yet.
#[must_use]
pub fn read_state(project_path: &str) -> ProjectState {
    let path = state_file_path(project_path);
    let Ok(contents) = std::fs::read_to_string(&path) else {
        return ProjectState::default();
    };
    serde_yaml::from_str(&contents).unwrap_or_default()
}

/// Absolute path to a project's state file.
#[must_use]
pub fn state_file_path(project_path: &str) -> PathBuf {
    Path::new(project_path).join(STATE_FILE_RELATIVE_PATH)
}

/// Resolve the most recent still-pending failure entry matching `command`
/// and `phase` to `resolution`. A missing state file, or no matching
/// pending entry, is a silent no-op — the caller has already decided an
/// intervention completed and has nothing useful to do if the file the
/// orchestrator wrote has since moved on.
pub fn resolve_failure(project_path: &str, command: &str, phase: i64, resolution: Resolution) -> std::io::Result<()> {
    let path = state_file_path(project_path);
    let Ok(contents) = std::fs::read_to_string(&path) else {
        return Ok(());
    };
    let Ok(mut state) = serde_yaml::from_str::<ProjectState>(&contents) else {
        return Ok(());
    };

    let Some(entry) = state
        .failures
        .iter_mut()
        .rev()
        .find(|f| f.command == command && f.phase == phase && f.is_pending())
    else {
        return Ok(());
    };
    entry.resolution = resolution;

    let yaml = serde_yaml::to_string(&state).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    let tmp_path = path.with_extension("yaml.tmp");
    std::fs::write(&tmp_path, yaml)?;
    std::fs::rename(&tmp_path, &path)
}

/// Read the trailing bytes of the orchestrator's output log, if present,
/// as a lossily-decoded `String`. Returns `None` for a missing file so
/// the classifier can skip the question-heuristic rule entirely rather
/// than treating an empty log as "no question detected".
#[must_use]
pub fn read_output_tail(project_path: &str) -> Option<String> {
    let path = Path::new(project_path).join(OUTPUT_LOG_RELATIVE_PATH);
    let metadata = std::fs::metadata(&path).ok()?;
    let len = metadata.len();
    let offset = len.saturating_sub(OUTPUT_TAIL_BYTES);

    use std::io::{Read, Seek, SeekFrom};
    let mut file = std::fs::File::open(&path).ok()?;
    file.seek(SeekFrom::Start(offset)).ok()?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf).ok()?;
    Some(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_state_file_reads_as_default() {
        let dir = tempfile::tempdir().unwrap();
        let state = read_state(dir.path().to_str().unwrap());
        assert!(state.failures.is_empty());
    }

    #[test]
    fn existing_state_file_parses_failures() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".agents")).unwrap();
        std::fs::write(
            state_file_path(dir.path().to_str().unwrap()),
            "failures:\n  - command: \"cargo test\"\n    phase: 2\n    errorCategory: test_failure\n    errorDetails: \"boom\"\n    retryCount: 0\n    maxRetries: 3\n    resolution: pending\n    timestamp: \"2026-01-01T00:00:00Z\"\n",
        )
        .unwrap();
        let state = read_state(dir.path().to_str().unwrap());
        assert_eq!(state.failures.len(), 1);
    }

    #[test]
    fn resolve_failure_updates_matching_pending_entry() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".agents")).unwrap();
        std::fs::write(
            state_file_path(dir.path().to_str().unwrap()),
            "failures:\n  - command: \"cargo test\"\n    phase: 2\n    errorCategory: test_failure\n    errorDetails: \"boom\"\n    retryCount: 0\n    maxRetries: 3\n    resolution: pending\n    timestamp: \"2026-01-01T00:00:00Z\"\n",
        )
        .unwrap();

        resolve_failure(dir.path().to_str().unwrap(), "cargo test", 2, Resolution::AutoFixed).unwrap();

        let state = read_state(dir.path().to_str().unwrap());
        assert_eq!(state.failures[0].resolution, Resolution::AutoFixed);
        assert!(state.pending_failures().is_empty());
    }

    #[test]
    fn resolve_failure_on_missing_file_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let result = resolve_failure(dir.path().to_str().unwrap(), "cargo test", 2, Resolution::AutoFixed);
        assert!(result.is_ok());
    }

    #[test]
    fn missing_output_log_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(read_output_tail(dir.path().to_str().unwrap()).is_none());
    }

    #[test]
    fn output_tail_reads_only_trailing_bytes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(".agents")).unwrap();
        let big = "x".repeat(10_000) + "\nShould I continue?";
        std::fs::write(dir.path().join(".agents/session-output.log"), &big).unwrap();
        let tail = read_output_tail(dir.path().to_str().unwrap()).unwrap();
        assert!(tail.len() <= big.len());
        assert!(tail.ends_with("Should I continue?"));
    }
}
