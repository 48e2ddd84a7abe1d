//! Runs a project's type-check and test commands to independently verify
//! a hot-fix session's claim of success, grounded on the teacher's
//! overseer idiom (`services::overseers::type_check`/`build`): spawn the
//! command, capture stdout+stderr, judge pass/fail by exit status.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::domain::errors::ProcessError;
use crate::domain::ports::{ValidationOutcome, Validator};

/// Splits a configured command string (`"cargo test --workspace"`) into a
/// program and arguments the same way a shell would for simple cases —
/// commands here are operator-configured, not attacker-controlled input.
fn split_command(command: &str) -> Option<(String, Vec<String>)> {
    let mut parts = command.split_whitespace();
    let program = parts.next()?.to_string();
    let args = parts.map(str::to_string).collect();
    Some((program, args))
}

/// Runs validation commands as real subprocesses in the project directory.
pub struct ShellValidator;

impl ShellValidator {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for ShellValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Validator for ShellValidator {
    async fn validate(
        &self,
        project_path: &str,
        commands: &[String],
        timeout: Duration,
    ) -> Result<ValidationOutcome, ProcessError> {
        let mut combined_output = String::new();

        for command in commands {
            let Some((program, args)) = split_command(command) else {
                combined_output.push_str("skipping empty command\n");
                continue;
            };

            let run = Command::new(&program)
                .args(&args)
                .current_dir(project_path)
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .output();

            let output = match tokio::time::timeout(timeout, run).await {
                Ok(Ok(output)) => output,
                Ok(Err(e)) => {
                    return Err(ProcessError::SpawnFailed(format!("{command}: {e}")));
                }
                Err(_) => {
                    return Err(ProcessError::TerminationTimeout(timeout));
                }
            };

            combined_output.push_str(&format!("$ {command}\n"));
            combined_output.push_str(&String::from_utf8_lossy(&output.stdout));
            combined_output.push_str(&String::from_utf8_lossy(&output.stderr));
            combined_output.push('\n');

            if !output.status.success() {
                return Ok(ValidationOutcome { passed: false, output: combined_output });
            }
        }

        Ok(ValidationOutcome { passed: true, output: combined_output })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_command_separates_program_and_args() {
        let (program, args) = split_command("cargo test --workspace").unwrap();
        assert_eq!(program, "cargo");
        assert_eq!(args, vec!["test".to_string(), "--workspace".to_string()]);
    }

    #[test]
    fn split_command_handles_empty_string() {
        assert!(split_command("").is_none());
    }

    #[tokio::test]
    async fn validate_stops_at_first_failing_command() {
        let validator = ShellValidator::new();
        let commands = vec!["true".to_string(), "false".to_string(), "true".to_string()];
        let outcome = validator.validate(".", &commands, Duration::from_secs(5)).await.unwrap();
        assert!(!outcome.passed);
    }

    #[tokio::test]
    async fn validate_passes_when_every_command_succeeds() {
        let validator = ShellValidator::new();
        let commands = vec!["true".to_string(), "true".to_string()];
        let outcome = validator.validate(".", &commands, Duration::from_secs(5)).await.unwrap();
        assert!(outcome.passed);
    }

    #[tokio::test]
    async fn validate_times_out_on_a_hanging_command() {
        let validator = ShellValidator::new();
        let commands = vec!["sleep 5".to_string()];
        let result = validator.validate(".", &commands, Duration::from_millis(50)).await;
        assert!(matches!(result, Err(ProcessError::TerminationTimeout(_))));
    }
}
