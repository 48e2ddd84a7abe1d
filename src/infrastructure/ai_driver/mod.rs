//! Drives AI coding-agent sessions by shelling out to the `claude` CLI in
//! `--print --output-format stream-json` mode: the prompt goes in over
//! stdin, newline-delimited JSON events come back over stdout, and budget/
//! turn/timeout caps are enforced as events arrive rather than only after
//! the process exits.

mod session;

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::domain::errors::AiDriverError;
use crate::domain::models::{BugLocation, Confidence, DiagnosticResult, HotFixResult};
use crate::domain::ports::{AiDriver, DiagnosisRequest, FixRequest};

use session::{apply_event, SessionOutcome};

/// Tools granted to a read-only diagnosis session: inspection and git
/// history only, nothing that can mutate the project tree.
const DIAGNOSIS_ALLOWED_TOOLS: &str = "Read,Grep,Glob,Bash(git log:*),Bash(git show:*),Bash(git diff:*)";

/// Tools granted to a write-capable fix session.
const FIX_ALLOWED_TOOLS: &str = "Read,Grep,Glob,Edit,Write,Bash";

#[derive(Debug, Clone)]
pub struct ClaudeCliConfig {
    /// Path to the `claude` executable, or a bare name resolved via `PATH`.
    pub claude_path: String,
    /// Model override; `None` lets the CLI use its own default.
    pub model: Option<String>,
}

impl Default for ClaudeCliConfig {
    fn default() -> Self {
        Self { claude_path: "claude".to_string(), model: None }
    }
}

/// `AiDriver` implementation backed by the `claude` CLI subprocess.
pub struct ClaudeCliDriver {
    config: ClaudeCliConfig,
}

impl ClaudeCliDriver {
    #[must_use]
    pub fn new(config: ClaudeCliConfig) -> Self {
        Self { config }
    }

    fn build_command(&self, project_path: &str, max_turns: u32, allowed_tools: &str) -> Command {
        let mut cmd = Command::new(&self.config.claude_path);
        cmd.current_dir(project_path);
        cmd.arg("--print");
        cmd.arg("--output-format").arg("stream-json");
        cmd.arg("--verbose");
        cmd.arg("--max-turns").arg(max_turns.to_string());
        cmd.arg("--allowedTools").arg(allowed_tools);
        if let Some(model) = &self.config.model {
            cmd.arg("--model").arg(model);
        }
        cmd.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::piped());
        cmd
    }

    /// Spawn `claude`, feed it `prompt`, and drive its streamed JSONL
    /// output to completion, to a budget/turn/timeout cutoff, or to
    /// `cancel` firing — whichever comes first. A fired `cancel` kills
    /// the subprocess immediately rather than waiting out the timeout, so
    /// shutdown stays bounded by the grace period the monitor enforces,
    /// not by `intervention_timeout_ms`.
    async fn run_session(
        &self,
        project_path: &str,
        prompt: &str,
        budget_usd: f64,
        max_turns: u32,
        timeout: Duration,
        allowed_tools: &str,
        cancel: &CancellationToken,
    ) -> Result<SessionOutcome, AiDriverError> {
        let mut cmd = self.build_command(project_path, max_turns, allowed_tools);
        let mut child = cmd.spawn().map_err(|e| AiDriverError::SpawnFailed(e.to_string()))?;

        let mut stdin =
            child.stdin.take().ok_or_else(|| AiDriverError::SpawnFailed("missing stdin handle".to_string()))?;
        let stdout =
            child.stdout.take().ok_or_else(|| AiDriverError::SpawnFailed("missing stdout handle".to_string()))?;

        stdin.write_all(prompt.as_bytes()).await.map_err(|e| AiDriverError::SpawnFailed(e.to_string()))?;
        drop(stdin);

        let drive = async {
            let mut reader = BufReader::new(stdout);
            let mut line = String::new();
            let mut outcome = SessionOutcome::default();

            loop {
                line.clear();
                let bytes_read =
                    reader.read_line(&mut line).await.map_err(|e| AiDriverError::MalformedOutput(e.to_string()))?;
                if bytes_read == 0 {
                    break;
                }

                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                let event: serde_json::Value =
                    serde_json::from_str(trimmed).map_err(|e| AiDriverError::MalformedOutput(e.to_string()))?;
                apply_event(&mut outcome, &event);

                if outcome.cost_usd > budget_usd {
                    return Err(AiDriverError::BudgetExceeded(budget_usd));
                }
                if outcome.num_turns > max_turns {
                    return Err(AiDriverError::TurnCapExceeded(max_turns));
                }
            }

            Ok(outcome)
        };

        let outcome = tokio::select! {
            result = tokio::time::timeout(timeout, drive) => result,
            () = cancel.cancelled() => {
                let _ = child.kill().await;
                return Err(AiDriverError::Cancelled);
            }
        };

        match outcome {
            Ok(Ok(outcome)) => {
                let status = child.wait().await.map_err(|e| AiDriverError::MalformedOutput(e.to_string()))?;
                if !status.success() && outcome.final_text.is_empty() {
                    return Err(AiDriverError::NonZeroExit(status.code().unwrap_or(-1)));
                }
                Ok(outcome)
            }
            Ok(Err(e)) => {
                let _ = child.kill().await;
                Err(e)
            }
            Err(_) => {
                let _ = child.kill().await;
                Err(AiDriverError::Timeout(timeout))
            }
        }
    }

    /// Count the working-copy diff left by a fix session, independently of
    /// whatever the session itself claims to have changed. Not a git repo,
    /// or no changes at all, both collapse to `(None, 0)`.
    async fn count_diff(project_path: &str) -> (Option<String>, u32) {
        let output = Command::new("git")
            .arg("diff")
            .arg("--numstat")
            .current_dir(project_path)
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .await;

        let Ok(output) = output else {
            return (None, 0);
        };
        if !output.status.success() {
            return (None, 0);
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut total_lines = 0u32;
        let mut files: Vec<String> = Vec::new();
        for line in stdout.lines() {
            let mut parts = line.split_whitespace();
            let added = parts.next().and_then(|s| s.parse::<u32>().ok()).unwrap_or(0);
            let removed = parts.next().and_then(|s| s.parse::<u32>().ok()).unwrap_or(0);
            if let Some(file) = parts.next() {
                total_lines += added + removed;
                files.push(file.to_string());
            }
        }

        match files.len() {
            0 => (None, 0),
            1 => (Some(files.remove(0)), total_lines),
            _ => (Some(files.join(", ")), total_lines),
        }
    }
}

#[async_trait]
impl AiDriver for ClaudeCliDriver {
    async fn diagnose(&self, request: DiagnosisRequest) -> Result<DiagnosticResult, AiDriverError> {
        let outcome = self
            .run_session(
                &request.project_path,
                &request.prompt,
                request.budget_usd,
                request.max_turns,
                request.timeout,
                DIAGNOSIS_ALLOWED_TOOLS,
                &request.cancel,
            )
            .await?;

        let parsed: DiagnosisOutput = serde_json::from_str(outcome.final_text.trim())
            .map_err(|e| AiDriverError::MalformedOutput(format!("diagnosis output not valid JSON: {e}")))?;

        Ok(DiagnosticResult {
            bug_location: parsed.bug_location,
            root_cause: parsed.root_cause,
            target_file: parsed.target_file,
            line_range: parsed.line_range,
            recommended_change: parsed.recommended_change,
            estimated_lines: parsed.estimated_lines,
            confidence: parsed.confidence,
            cost_usd: outcome.cost_usd,
            ai_session_id: outcome.session_id.unwrap_or_else(Uuid::new_v4),
        })
    }

    /// Runs the fix session and independently counts the resulting diff.
    /// `success`/`validation_passed`/`revert_performed` are left at their
    /// not-yet-validated defaults here — applying the project's
    /// type-check/test commands and deciding acceptance is the caller's
    /// job, using `HotFixResult::accepted`/`reverted` to rebuild the final
    /// record once that validation has run.
    async fn fix(&self, request: FixRequest, diagnosis: &DiagnosticResult) -> Result<HotFixResult, AiDriverError> {
        let prompt = format_fix_prompt(&request, diagnosis);
        let outcome = self
            .run_session(
                &request.project_path,
                &prompt,
                request.budget_usd,
                request.max_turns,
                request.timeout,
                FIX_ALLOWED_TOOLS,
                &request.cancel,
            )
            .await?;

        let (file_modified, lines_changed) = Self::count_diff(&request.project_path).await;

        Ok(HotFixResult {
            success: false,
            file_modified,
            lines_changed,
            validation_passed: false,
            validation_output: String::new(),
            cost_usd: outcome.cost_usd,
            revert_performed: false,
        })
    }
}

/// Expected shape of a diagnosis session's final JSON answer.
#[derive(Debug, serde::Deserialize)]
struct DiagnosisOutput {
    bug_location: BugLocation,
    root_cause: String,
    target_file: Option<String>,
    line_range: Option<(u32, u32)>,
    recommended_change: String,
    estimated_lines: u32,
    confidence: Confidence,
}

fn format_fix_prompt(request: &FixRequest, diagnosis: &DiagnosticResult) -> String {
    format!(
        "{}\n\nDiagnosis from the prior read-only session:\n- root cause: {}\n- target file: {}\n- recommended change: {}\n",
        request.prompt,
        diagnosis.root_cause,
        diagnosis.target_file.as_deref().unwrap_or("(unknown)"),
        diagnosis.recommended_change,
    )
}
