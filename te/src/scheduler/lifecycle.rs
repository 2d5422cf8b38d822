//! Task lifecycle state machine and retry policy
//!
//! State transitions:
//! - Pending -> Processing -> Completed
//! - Pending -> Processing -> Pending (retry, escalated priority)
//! - Pending -> Processing -> Failed (retry budget exhausted or shutdown)
//! - Pending -> Failed (shutdown while queued)
//!
//! These functions only mutate the [`Task`] record. Moving ids between the
//! queue and the index sets is the engine's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{Priority, Task, TaskDescription, TaskStatus, generate_task_id};
use crate::error::TaskError;

use super::config::EngineConfig;

/// How a failed attempt re-enters the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Priority increase applied on each retry
    #[serde(default = "default_escalation_step")]
    pub escalation_step: u8,

    /// Escalation never raises a task above this priority
    #[serde(default = "default_max_priority")]
    pub max_priority: Priority,
}

fn default_escalation_step() -> u8 {
    1
}

fn default_max_priority() -> Priority {
    Priority::MAX
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            escalation_step: default_escalation_step(),
            max_priority: default_max_priority(),
        }
    }
}

impl RetryPolicy {
    /// Priority a task is re-enqueued at after a failed attempt
    pub fn retry_priority(&self, current: Priority) -> Priority {
        current.escalate(self.escalation_step, self.max_priority)
    }

    /// Whether a failed task gets another attempt
    pub fn should_retry(&self, task: &Task, error: &TaskError) -> bool {
        error.is_retryable() && task.retry_count < task.retry_limit
    }
}

/// Result of applying a failure to a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Task is pending again and must be re-enqueued at `priority`
    Retry { priority: Priority },
    /// Task is terminally failed
    Failed,
}

/// Build a pending task from a submission, filling unset fields from config
pub fn new_task(description: TaskDescription, config: &EngineConfig, now: DateTime<Utc>) -> Task {
    Task {
        id: description.id.unwrap_or_else(generate_task_id),
        description: description.description,
        task_type: description.task_type,
        priority: description.priority.unwrap_or(config.default_priority),
        status: TaskStatus::Pending,
        created_at: now,
        started_at: None,
        completed_at: None,
        timeout_ms: description.timeout_ms.unwrap_or(config.default_timeout_ms),
        retry_count: 0,
        retry_limit: description.retry_limit.unwrap_or(config.default_retry_limit),
        attempts: 0,
        result: None,
        error: None,
        progress: 0,
        progress_message: None,
        metadata: description.metadata,
        options: description.options,
    }
}

/// Pending -> Processing
pub fn start_attempt(task: &mut Task, now: DateTime<Utc>) {
    task.status = TaskStatus::Processing;
    task.started_at = Some(now);
    task.attempts += 1;
    task.progress = 0;
    task.progress_message = None;
}

/// Processing -> Completed
pub fn complete(task: &mut Task, result: Value, now: DateTime<Utc>) {
    task.status = TaskStatus::Completed;
    task.completed_at = Some(now);
    task.progress = 100;
    task.result = Some(result);
    task.error = None;
}

/// Processing -> Pending (retry) or -> Failed
pub fn fail(task: &mut Task, error: TaskError, policy: &RetryPolicy, now: DateTime<Utc>) -> FailureOutcome {
    if policy.should_retry(task, &error) {
        task.retry_count += 1;
        task.status = TaskStatus::Pending;
        task.started_at = None;
        task.error = None;
        task.progress = 0;
        task.progress_message = None;
        task.priority = policy.retry_priority(task.priority);
        FailureOutcome::Retry {
            priority: task.priority,
        }
    } else {
        task.status = TaskStatus::Failed;
        task.completed_at = Some(now);
        task.result = None;
        task.error = Some(error);
        FailureOutcome::Failed
    }
}
