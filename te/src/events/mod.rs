//! Event bus for live observability of task lifecycles
//!
//! Every lifecycle transition emits a [`TaskEvent`] carrying a snapshot of the
//! task. Consumers (file logger, CLI, dashboards) subscribe to the bus.
//!
//! ```text
//!   submit_task ──► TaskSubmitted
//!   dispatch    ──► TaskStarted
//!   progress    ──► TaskProgress
//!   failure     ──► TaskRetried | TaskFailed
//!   success     ──► TaskCompleted
//!                        │
//!          ┌─────────────┼─────────────┐
//!          ▼             ▼             ▼
//!     EventLogger    CLI output    other subscribers
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! let mut rx = engine.subscribe();
//! while let Ok(event) = rx.recv().await {
//!     println!("{} {}", event.event_type(), event.task_id());
//! }
//! ```

mod bus;
mod logger;
mod types;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus};
pub use logger::{EventLogger, read_events, spawn_event_logger};
pub use types::{EventLogEntry, TaskEvent};
