//! Event Bus - pub/sub for task lifecycle events
//!
//! The EventBus uses a tokio broadcast channel to deliver events to all
//! subscribers. The engine emits, observers (loggers, CLI, dashboards) subscribe.

use tokio::sync::broadcast;
use tracing::debug;

use super::types::TaskEvent;
use crate::domain::Task;
use crate::error::TaskError;

/// Default channel capacity (events)
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Central event bus for engine activity
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TaskEvent>,
}

impl EventBus {
    /// Create a new event bus with the given capacity
    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "EventBus::new: creating event bus");
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Create a new event bus with default capacity
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Emit an event to all subscribers
    ///
    /// Fire-and-forget: with no subscribers the event is dropped, and slow
    /// subscribers lose the oldest events.
    pub fn emit(&self, event: TaskEvent) {
        debug!(event_type = event.event_type(), task_id = event.task_id(), "EventBus::emit");
        let _ = self.tx.send(event);
    }

    /// Subscribe to events emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<TaskEvent> {
        debug!("EventBus::subscribe: new subscriber");
        self.tx.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    // === Convenience methods ===

    pub fn submitted(&self, task: &Task) {
        self.emit(TaskEvent::TaskSubmitted { task: task.clone() });
    }

    pub fn started(&self, task: &Task) {
        self.emit(TaskEvent::TaskStarted { task: task.clone() });
    }

    pub fn progress(&self, task: &Task, message: Option<String>) {
        self.emit(TaskEvent::TaskProgress {
            task: task.clone(),
            message,
        });
    }

    pub fn retried(&self, task: &Task, error: TaskError) {
        self.emit(TaskEvent::TaskRetried {
            task: task.clone(),
            error,
        });
    }

    pub fn completed(&self, task: &Task) {
        self.emit(TaskEvent::TaskCompleted { task: task.clone() });
    }

    pub fn failed(&self, task: &Task) {
        self.emit(TaskEvent::TaskFailed { task: task.clone() });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskDescription;
    use crate::scheduler::{EngineConfig, lifecycle};

    fn sample_task(id: &str) -> Task {
        lifecycle::new_task(
            TaskDescription::new("sample").with_id(id),
            &EngineConfig::default(),
            chrono::Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_emit_and_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.submitted(&sample_task("a"));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type(), "TaskSubmitted");
        assert_eq!(event.task_id(), "a");
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = EventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.retried(&sample_task("b"), TaskError::executor("flaky"));

        assert_eq!(rx1.recv().await.unwrap().event_type(), "TaskRetried");
        assert_eq!(rx2.recv().await.unwrap().event_type(), "TaskRetried");
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::default();
        assert_eq!(bus.subscriber_count(), 0);
        bus.completed(&sample_task("c"));
    }

    #[tokio::test]
    async fn test_event_order_preserved() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let task = sample_task("d");

        bus.submitted(&task);
        bus.started(&task);
        bus.progress(&task, Some("halfway".to_string()));
        bus.completed(&task);

        let mut types = Vec::new();
        for _ in 0..4 {
            types.push(rx.recv().await.unwrap().event_type());
        }
        assert_eq!(types, vec!["TaskSubmitted", "TaskStarted", "TaskProgress", "TaskCompleted"]);
    }
}
