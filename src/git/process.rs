//! git::process
//!
//! Subprocess execution with captured output.
//!
//! Git is driven through its CLI rather than a library binding: the audit
//! trail wants exactly what the operator would have seen running the same
//! command, stdout/stderr/exit code included.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;

/// Captured outcome of one subprocess invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyOutput {
    /// Working directory, relative to the workspace where possible.
    pub dir: String,
    pub std_out: String,
    pub std_err: String,
    pub exit_code: i32,
}

impl ApplyOutput {
    /// Synthetic output for milestones that ran no subprocess.
    pub fn dummy(dir: impl Into<String>, std_out: impl Into<String>, exit_code: i32) -> Self {
        Self {
            dir: dir.into(),
            std_out: std_out.into(),
            std_err: String::new(),
            exit_code,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Multi-line rendering for logs and operator inspection.
    pub fn full_description(&self) -> String {
        format!(
            "DIR: {}\nEXIT_CODE: {}\n=== STD_OUT ===\n{}\n===============\n=== STD_ERR ===\n{}\n===============",
            self.dir, self.exit_code, self.std_out, self.std_err
        )
    }
}

/// One labeled step in a reconciliation history.
///
/// Histories are ordered and append-only; entries are never reordered or
/// removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub label: String,
    pub output: ApplyOutput,
}

impl Action {
    pub fn new(label: impl Into<String>, output: ApplyOutput) -> Self {
        Self {
            label: label.into(),
            output,
        }
    }
}

/// Runs a command and waits for it, capturing everything.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, working_dir: &Path, command: &[&str]) -> ApplyOutput;
}

/// [`ProcessRunner`] backed by `tokio::process`.
///
/// A spawn failure (binary missing, directory gone) becomes a synthetic
/// output with exit code -1 instead of an error; the history records it like
/// any other failed step.
#[derive(Default)]
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, working_dir: &Path, command: &[&str]) -> ApplyOutput {
        let dir = working_dir.display().to_string();
        let Some((program, args)) = command.split_first() else {
            return ApplyOutput {
                dir,
                std_out: String::new(),
                std_err: "empty command".to_string(),
                exit_code: -1,
            };
        };
        match Command::new(program)
            .args(args)
            .current_dir(working_dir)
            .output()
            .await
        {
            Ok(output) => ApplyOutput {
                dir,
                std_out: String::from_utf8_lossy(&output.stdout).into_owned(),
                std_err: String::from_utf8_lossy(&output.stderr).into_owned(),
                exit_code: output.status.code().unwrap_or(-1),
            },
            Err(e) => ApplyOutput {
                dir,
                std_out: String::new(),
                std_err: format!("failed to launch '{}': {}", program, e),
                exit_code: -1,
            },
        }
    }
}
