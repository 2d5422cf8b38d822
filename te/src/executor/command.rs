//! Command executor - runs a task's `options.command` as a child process

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use eyre::{Context, eyre};
use serde_json::{Value, json};
use tokio::process::Command;
use tracing::debug;

use super::TaskExecutor;
use crate::domain::Task;

/// Executor that runs shell-free commands described in task options
///
/// Recognized options:
/// - `command` (string, required): program to run
/// - `args` (array of strings): arguments
/// - `cwd` (string): working directory, overriding the executor default
///
/// Exit code 0 resolves with `{ "stdout", "stderr", "exit_code" }`; any other
/// exit is an error carrying stderr.
#[derive(Debug, Clone, Default)]
pub struct CommandExecutor {
    working_dir: Option<PathBuf>,
}

impl CommandExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default working directory for commands without a `cwd` option
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    fn build_command(&self, task: &Task) -> eyre::Result<Command> {
        let program = task
            .options
            .get("command")
            .and_then(Value::as_str)
            .ok_or_else(|| eyre!("task {} has no `command` option", task.id))?;

        let args: Vec<String> = match task.options.get("args") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect(),
            Some(other) => return Err(eyre!("task {} has non-array `args` option: {}", task.id, other)),
        };

        let mut cmd = Command::new(program);
        cmd.args(&args);

        // A relative `cwd` option is taken relative to the executor default
        let cwd = match (task.options.get("cwd").and_then(Value::as_str), &self.working_dir) {
            (Some(dir), Some(base)) if Path::new(dir).is_relative() => Some(base.join(dir)),
            (Some(dir), _) => Some(PathBuf::from(dir)),
            (None, base) => base.clone(),
        };
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }

        debug!(task_id = %task.id, %program, ?args, "CommandExecutor: built command");
        Ok(cmd)
    }
}

#[async_trait]
impl TaskExecutor for CommandExecutor {
    async fn coordinate(&self, task: Task) -> eyre::Result<Value> {
        let mut cmd = self.build_command(&task)?;
        let output = cmd
            .output()
            .await
            .with_context(|| format!("failed to spawn command for task {}", task.id))?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).trim_end().to_string();
        let exit_code = output.status.code();

        debug!(task_id = %task.id, ?exit_code, "CommandExecutor: command finished");

        if output.status.success() {
            Ok(json!({
                "stdout": stdout,
                "stderr": stderr,
                "exit_code": exit_code,
            }))
        } else {
            let code = exit_code.map_or_else(|| "signal".to_string(), |c| c.to_string());
            Err(eyre!("command exited with {}: {}", code, stderr))
        }
    }
}
