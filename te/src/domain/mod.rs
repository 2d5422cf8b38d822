//! Domain types for the task engine

mod priority;
mod task;

pub use priority::Priority;
pub use task::{Payload, Task, TaskDescription, TaskId, TaskStatus, generate_task_id};
