//! Executor capability and the bridge that drives it
//!
//! The engine never knows what a task does. Hosts supply a [`TaskExecutor`]
//! at construction time; the bridge calls it once per attempt, races it
//! against the task's timeout, and normalizes the outcome.

mod bridge;
mod command;

pub use bridge::run_attempt;
pub use command::CommandExecutor;

use std::future::Future;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::Task;

/// External capability that performs the actual work of a task
///
/// Implementations receive a snapshot of the task (including its opaque
/// `metadata` and `options`) and return an opaque result. Returned errors
/// are retried according to the engine's retry policy.
#[async_trait]
pub trait TaskExecutor: Send + Sync + 'static {
    async fn coordinate(&self, task: Task) -> eyre::Result<Value>;
}

/// Executor backed by an async closure
///
/// ```rust,ignore
/// let executor = FnExecutor::new(|task: Task| async move {
///     eyre::Ok(serde_json::json!({ "echo": task.description }))
/// });
/// ```
pub struct FnExecutor<F> {
    f: F,
}

impl<F, Fut> FnExecutor<F>
where
    F: Fn(Task) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = eyre::Result<Value>> + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> TaskExecutor for FnExecutor<F>
where
    F: Fn(Task) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = eyre::Result<Value>> + Send + 'static,
{
    async fn coordinate(&self, task: Task) -> eyre::Result<Value> {
        (self.f)(task).await
    }
}
