//! taskengine - Priority Task Scheduling Engine
//!
//! taskengine accepts units of work ("tasks"), orders them by priority, bounds
//! how many run at once, enforces per-task timeouts, and retries failures with
//! escalating priority. What a task actually does is supplied by the host as a
//! [`TaskExecutor`].
//!
//! # Core Concepts
//!
//! - **Priority first**: higher priority dispatches sooner, FIFO among equals
//! - **Slot budget**: at most `max_concurrent_tasks` attempts in flight
//! - **Escalating retries**: each failed attempt re-queues one priority higher
//! - **Handles**: `submit_task` returns a future that resolves exactly once
//!
//! # Modules
//!
//! - [`domain`] - Task, TaskDescription, Priority
//! - [`scheduler`] - TaskEngine, queue, lifecycle, stats
//! - [`executor`] - Executor capability, timeout bridge, command executor
//! - [`events`] - Lifecycle event bus and JSONL logger
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface
//!
//! # Example
//!
//! ```rust,ignore
//! let executor = Arc::new(FnExecutor::new(|task: Task| async move {
//!     eyre::Ok(serde_json::json!({ "done": task.id }))
//! }));
//! let engine = TaskEngine::spawn(EngineConfig::default(), executor)?;
//! let handle = engine.submit_task(TaskDescription::new("resize images")).await?;
//! let result = handle.await?;
//! ```

pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod executor;
pub mod scheduler;

// Re-export commonly used types
pub use config::Config;
pub use domain::{Payload, Priority, Task, TaskDescription, TaskId, TaskStatus, generate_task_id};
pub use error::{EngineError, TaskError};
pub use events::{EventBus, EventLogEntry, EventLogger, TaskEvent, read_events, spawn_event_logger};
pub use executor::{CommandExecutor, FnExecutor, TaskExecutor};
pub use scheduler::{EngineConfig, RetryPolicy, TaskEngine, TaskHandle, TaskStats};
