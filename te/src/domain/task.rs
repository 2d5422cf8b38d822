//! Task domain types
//!
//! A [`TaskDescription`] is what callers submit; a [`Task`] is the engine's
//! record of that work plus its lifecycle metadata.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Priority;
use crate::error::TaskError;

/// Task identifier (caller-supplied or generated)
pub type TaskId = String;

/// Opaque key-value payload passed through to the executor untouched
pub type Payload = serde_json::Map<String, Value>;

/// Generate a new time-ordered task ID
pub fn generate_task_id() -> TaskId {
    uuid::Uuid::now_v7().to_string()
}

/// Lifecycle status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Waiting in the priority queue (first attempt or retry)
    #[default]
    Pending,
    /// Dispatched to the executor
    Processing,
    /// Finished successfully
    Completed,
    /// Finished with a terminal error
    Failed,
}

impl TaskStatus {
    /// Completed or failed - no further transitions
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// What a caller submits to the engine
///
/// Unset fields fall back to the engine's configured defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskDescription {
    #[serde(default)]
    pub id: Option<TaskId>,

    pub description: String,

    #[serde(default, rename = "type")]
    pub task_type: Option<String>,

    #[serde(default)]
    pub priority: Option<Priority>,

    /// Per-attempt timeout in milliseconds
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    #[serde(default)]
    pub retry_limit: Option<u32>,

    #[serde(default)]
    pub metadata: Payload,

    #[serde(default)]
    pub options: Payload,
}

impl TaskDescription {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<TaskId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_type(mut self, task_type: impl Into<String>) -> Self {
        self.task_type = Some(task_type.into());
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    pub fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = Some(retry_limit);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.options.insert(key.into(), value);
        self
    }
}

/// Engine-side record of one unit of work
///
/// Clones of this struct are snapshots: they are what lookups return, what
/// events carry, and what the executor receives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub description: String,
    #[serde(rename = "type")]
    pub task_type: Option<String>,
    pub priority: Priority,
    pub status: TaskStatus,

    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,

    /// Per-attempt timeout in milliseconds
    pub timeout_ms: u64,

    pub retry_count: u32,
    pub retry_limit: u32,

    /// Number of times the task has been dispatched
    pub attempts: u32,

    pub result: Option<Value>,
    pub error: Option<TaskError>,

    pub progress: u8,
    pub progress_message: Option<String>,

    pub metadata: Payload,
    pub options: Payload,
}

impl Task {
    /// Per-attempt timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Time between the current attempt starting and the task finishing
    pub fn processing_time(&self) -> Option<Duration> {
        let started = self.started_at?;
        let completed = self.completed_at?;
        (completed - started).to_std().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_builder() {
        let desc = TaskDescription::new("index repo")
            .with_id("t-1")
            .with_type("indexer")
            .with_priority(Priority::new(7).unwrap())
            .with_timeout(Duration::from_secs(2))
            .with_retry_limit(4)
            .with_metadata("owner", serde_json::json!("ci"))
            .with_option("depth", serde_json::json!(3));

        assert_eq!(desc.id.as_deref(), Some("t-1"));
        assert_eq!(desc.task_type.as_deref(), Some("indexer"));
        assert_eq!(desc.priority.unwrap().value(), 7);
        assert_eq!(desc.timeout_ms, Some(2000));
        assert_eq!(desc.retry_limit, Some(4));
        assert_eq!(desc.metadata["owner"], "ci");
        assert_eq!(desc.options["depth"], 3);
    }

    #[test]
    fn test_description_from_yaml() {
        let yaml = r#"
description: build docs
type: shell
priority: 8
timeout_ms: 1500
options:
  command: echo
  args: ["hi"]
"#;
        let desc: TaskDescription = serde_yaml::from_str(yaml).unwrap();
        assert!(desc.id.is_none());
        assert_eq!(desc.task_type.as_deref(), Some("shell"));
        assert_eq!(desc.priority.unwrap().value(), 8);
        assert_eq!(desc.timeout_ms, Some(1500));
        assert_eq!(desc.options["command"], "echo");
        assert!(desc.metadata.is_empty());
    }

    #[test]
    fn test_description_rejects_bad_priority() {
        let yaml = "description: x\npriority: 11\n";
        assert!(serde_yaml::from_str::<TaskDescription>(yaml).is_err());
    }

    #[test]
    fn test_with_timeout_saturates() {
        let desc = TaskDescription::new("forever").with_timeout(Duration::MAX);
        assert_eq!(desc.timeout_ms, Some(u64::MAX));

        let desc = TaskDescription::new("short").with_timeout(Duration::from_millis(250));
        assert_eq!(desc.timeout_ms, Some(250));
    }

    #[test]
    fn test_status_display_and_terminal() {
        assert_eq!(TaskStatus::Processing.to_string(), "processing");
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Processing.is_terminal());
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = generate_task_id();
        let b = generate_task_id();
        assert_ne!(a, b);
    }
}
