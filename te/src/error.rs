//! Error types for the task engine

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a task attempt (or the whole task) failed
///
/// `Executor` and `Timeout` are retryable; `Shutdown` is always terminal.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskError {
    #[error("{message}")]
    Executor { message: String },

    #[error("Task timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Task stopped: {reason}")]
    Shutdown { reason: String },
}

impl TaskError {
    /// Error raised by the executor capability
    pub fn executor(message: impl Into<String>) -> Self {
        Self::Executor {
            message: message.into(),
        }
    }

    /// Error synthesized during shutdown
    pub fn shutdown(reason: impl Into<String>) -> Self {
        Self::Shutdown { reason: reason.into() }
    }

    /// Whether the retry policy may schedule another attempt
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::Shutdown { .. })
    }
}

/// Errors returned by engine operations (not by task execution)
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Priority {0} out of range (expected 1..=10)")]
    InvalidPriority(u8),

    #[error("Invalid priority: {0}")]
    InvalidPriorityText(String),

    #[error("Task already exists: {0}")]
    DuplicateTask(String),

    #[error("Engine has been stopped")]
    Stopped,

    #[error("Invalid engine config: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(TaskError::executor("boom").is_retryable());
        assert!(TaskError::Timeout { timeout_ms: 50 }.is_retryable());
        assert!(!TaskError::shutdown("stop_all_tasks").is_retryable());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(TaskError::executor("disk full").to_string(), "disk full");
        assert_eq!(
            TaskError::Timeout { timeout_ms: 50 }.to_string(),
            "Task timed out after 50ms"
        );
        assert!(TaskError::shutdown("engine stopped").to_string().contains("engine stopped"));
    }

    #[test]
    fn test_task_error_serde() {
        let json = serde_json::to_value(TaskError::Timeout { timeout_ms: 10 }).unwrap();
        assert_eq!(json["kind"], "timeout");
        assert_eq!(json["timeout_ms"], 10);
    }
}
