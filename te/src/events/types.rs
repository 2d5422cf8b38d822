//! Event types for task engine activity
//!
//! Every event carries a full snapshot of the task at the moment it was
//! emitted, so subscribers never need to call back into the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Task;
use crate::error::TaskError;

/// Lifecycle events emitted by the engine
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TaskEvent {
    /// A task was accepted and queued
    TaskSubmitted { task: Task },
    /// A task was dispatched to the executor
    TaskStarted { task: Task },
    /// The executor reported progress
    TaskProgress { task: Task, message: Option<String> },
    /// An attempt failed and the task was re-queued
    TaskRetried { task: Task, error: TaskError },
    /// A task finished successfully
    TaskCompleted { task: Task },
    /// A task finished with a terminal error
    TaskFailed { task: Task },
}

impl TaskEvent {
    /// The task snapshot carried by this event
    pub fn task(&self) -> &Task {
        match self {
            Self::TaskSubmitted { task }
            | Self::TaskStarted { task }
            | Self::TaskProgress { task, .. }
            | Self::TaskRetried { task, .. }
            | Self::TaskCompleted { task }
            | Self::TaskFailed { task } => task,
        }
    }

    /// ID of the task this event is about
    pub fn task_id(&self) -> &str {
        &self.task().id
    }

    /// Event type name for logging and filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::TaskSubmitted { .. } => "TaskSubmitted",
            Self::TaskStarted { .. } => "TaskStarted",
            Self::TaskProgress { .. } => "TaskProgress",
            Self::TaskRetried { .. } => "TaskRetried",
            Self::TaskCompleted { .. } => "TaskCompleted",
            Self::TaskFailed { .. } => "TaskFailed",
        }
    }
}

/// Event with timestamp for persistence
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventLogEntry {
    /// Timestamp of the event
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,
    /// The event
    pub event: TaskEvent,
}

impl EventLogEntry {
    /// Create a new log entry with current timestamp
    pub fn new(event: TaskEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskDescription;
    use crate::scheduler::{EngineConfig, lifecycle};

    fn sample_task() -> Task {
        lifecycle::new_task(
            TaskDescription::new("sample").with_id("task-1"),
            &EngineConfig::default(),
            Utc::now(),
        )
    }

    #[test]
    fn test_event_task_id() {
        let event = TaskEvent::TaskSubmitted { task: sample_task() };
        assert_eq!(event.task_id(), "task-1");
    }

    #[test]
    fn test_event_type() {
        let task = sample_task();
        let events = vec![
            TaskEvent::TaskSubmitted { task: task.clone() },
            TaskEvent::TaskStarted { task: task.clone() },
            TaskEvent::TaskProgress {
                task: task.clone(),
                message: Some("half".to_string()),
            },
            TaskEvent::TaskRetried {
                task: task.clone(),
                error: TaskError::executor("boom"),
            },
            TaskEvent::TaskCompleted { task: task.clone() },
            TaskEvent::TaskFailed { task },
        ];
        let types: Vec<_> = events.iter().map(|e| e.event_type()).collect();
        assert_eq!(
            types,
            vec![
                "TaskSubmitted",
                "TaskStarted",
                "TaskProgress",
                "TaskRetried",
                "TaskCompleted",
                "TaskFailed"
            ]
        );
    }

    #[test]
    fn test_event_log_entry_serialization() {
        let entry = EventLogEntry::new(TaskEvent::TaskRetried {
            task: sample_task(),
            error: TaskError::Timeout { timeout_ms: 50 },
        });

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"ts\""));
        assert!(json.contains("TaskRetried"));
        assert!(json.contains("task-1"));

        let parsed: EventLogEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.event.event_type(), "TaskRetried");
    }
}
