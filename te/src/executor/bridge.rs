//! Executor bridge - one attempt, raced against the task timeout

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use super::TaskExecutor;
use crate::domain::Task;
use crate::error::TaskError;

/// Run one attempt of `task` on `executor`
///
/// The executor call runs on its own tokio task. If the timeout fires first
/// the call is detached, not aborted: it may keep running, but whatever it
/// eventually returns is dropped here.
pub async fn run_attempt(executor: Arc<dyn TaskExecutor>, task: Task) -> Result<Value, TaskError> {
    let task_id = task.id.clone();
    let timeout = task.timeout();
    let timeout_ms = task.timeout_ms;
    debug!(%task_id, timeout_ms, attempt = task.attempts, "run_attempt: called");

    let mut call = tokio::spawn(async move { executor.coordinate(task).await });

    tokio::select! {
        biased;

        joined = &mut call => match joined {
            Ok(Ok(value)) => {
                debug!(%task_id, "run_attempt: executor succeeded");
                Ok(value)
            }
            Ok(Err(e)) => {
                debug!(%task_id, error = %e, "run_attempt: executor returned error");
                Err(TaskError::executor(format!("{e:#}")))
            }
            Err(join_err) => {
                warn!(%task_id, error = %join_err, "run_attempt: executor task aborted");
                Err(TaskError::executor(format!("executor panicked: {join_err}")))
            }
        },

        _ = tokio::time::sleep(timeout) => {
            warn!(%task_id, timeout_ms, "run_attempt: timed out, detaching executor call");
            Err(TaskError::Timeout { timeout_ms })
        }
    }
}
