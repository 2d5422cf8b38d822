//! Scheduler: priority queue, task lifecycle, and the dispatching engine

mod config;
mod core;
pub mod lifecycle;
mod queue;
mod stats;

pub use config::EngineConfig;
pub use self::core::{TaskEngine, TaskHandle};
pub use lifecycle::{FailureOutcome, RetryPolicy};
pub use queue::PriorityQueue;
pub use stats::{StatsTracker, TaskStats};
