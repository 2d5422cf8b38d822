//! TaskEngine - priority dispatch with bounded concurrency and retries

use std::collections::{HashMap, HashSet, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use chrono::Utc;
use serde_json::Value;
use tokio::sync::{Mutex, Notify, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::domain::{Task, TaskDescription, TaskId, TaskStatus};
use crate::error::{EngineError, TaskError};
use crate::events::{EventBus, TaskEvent};
use crate::executor::{TaskExecutor, run_attempt};

use super::config::EngineConfig;
use super::lifecycle::{self, FailureOutcome};
use super::queue::PriorityQueue;
use super::stats::{StatsTracker, TaskStats};

/// Reason attached to tasks failed by `stop_all_tasks`
const SHUTDOWN_REASON: &str = "engine stopped";

type Completion = oneshot::Sender<Result<Value, TaskError>>;

/// Arena entry: the task plus its one-shot completion sender
struct TaskRecord {
    task: Task,
    completion: Option<Completion>,
}

impl TaskRecord {
    /// Fire the completion handle; later calls are no-ops
    fn settle(&mut self, outcome: Result<Value, TaskError>) {
        if let Some(tx) = self.completion.take() {
            // Receiver may have been dropped by a caller that stopped waiting
            let _ = tx.send(outcome);
        }
    }
}

/// Internal state protected by the engine mutex
///
/// Every task id lives in exactly one of `queue`, `active`, `completed`,
/// `failed`; `tasks` is the arena they index into.
struct EngineInner {
    tasks: HashMap<TaskId, TaskRecord>,
    queue: PriorityQueue<TaskId>,
    active: HashSet<TaskId>,
    completed: HashSet<TaskId>,
    failed: HashSet<TaskId>,

    /// Finished ids, oldest first (retention order)
    finished: VecDeque<TaskId>,

    stats: StatsTracker,
    stopped: bool,
}

impl EngineInner {
    fn new() -> Self {
        Self {
            tasks: HashMap::new(),
            queue: PriorityQueue::new(),
            active: HashSet::new(),
            completed: HashSet::new(),
            failed: HashSet::new(),
            finished: VecDeque::new(),
            stats: StatsTracker::default(),
            stopped: false,
        }
    }

    /// Terminal-fail a task that was queued or active, rejecting its handle
    fn fail_terminal(&mut self, id: &TaskId, error: TaskError, config: &EngineConfig, events: &EventBus) {
        let Some(record) = self.tasks.get_mut(id) else {
            return;
        };
        if record.task.status.is_terminal() {
            return;
        }
        let outcome = lifecycle::fail(&mut record.task, error.clone(), &config.retry, Utc::now());
        debug_assert_eq!(outcome, FailureOutcome::Failed);
        events.failed(&record.task);
        record.settle(Err(error));

        self.stats.record_failed();
        self.failed.insert(id.clone());
        self.finished.push_back(id.clone());
    }

    /// Evict the oldest finished tasks beyond the retention limit
    fn enforce_retention(&mut self, retention: Option<usize>) {
        let Some(limit) = retention else {
            return;
        };
        while self.finished.len() > limit {
            let Some(id) = self.finished.pop_front() else {
                break;
            };
            self.completed.remove(&id);
            self.failed.remove(&id);
            self.tasks.remove(&id);
            debug!(%id, "enforce_retention: evicted finished task");
        }
    }
}

/// State shared between engine handles, the dispatch loop, and in-flight attempts
struct Shared {
    config: EngineConfig,
    executor: Arc<dyn TaskExecutor>,
    inner: Mutex<EngineInner>,
    events: EventBus,
    wake: Arc<Notify>,
    shutdown_tx: watch::Sender<bool>,
    loop_handle: std::sync::Mutex<Option<JoinHandle<()>>>,
}

/// Handle to a submitted task
///
/// Resolves with the executor's result, or with the last error once the
/// retry budget is exhausted or the engine is stopped.
#[derive(Debug)]
pub struct TaskHandle {
    id: TaskId,
    rx: oneshot::Receiver<Result<Value, TaskError>>,
}

impl TaskHandle {
    /// ID of the submitted task
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Future for TaskHandle {
    type Output = Result<Value, TaskError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => Poll::Ready(Err(TaskError::shutdown("engine dropped before task finished"))),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// The TaskEngine accepts tasks, orders them by priority, runs at most
/// `max_concurrent_tasks` at once, and retries failures with escalating
/// priority.
///
/// Cloning is cheap; all clones drive the same engine.
#[derive(Clone)]
pub struct TaskEngine {
    shared: Arc<Shared>,
}

impl TaskEngine {
    /// Create an engine without starting its dispatch loop
    ///
    /// Tasks submitted before [`start`](Self::start) wait in the queue.
    pub fn new(config: EngineConfig, executor: Arc<dyn TaskExecutor>) -> Result<Self, EngineError> {
        debug!(?config, "TaskEngine::new: called");
        config.validate()?;

        let (shutdown_tx, _) = watch::channel(false);
        let events = EventBus::new(config.event_capacity);

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                executor,
                inner: Mutex::new(EngineInner::new()),
                events,
                wake: Arc::new(Notify::new()),
                shutdown_tx,
                loop_handle: std::sync::Mutex::new(None),
            }),
        })
    }

    /// Create an engine and start its dispatch loop (requires a tokio runtime)
    pub fn spawn(config: EngineConfig, executor: Arc<dyn TaskExecutor>) -> Result<Self, EngineError> {
        let engine = Self::new(config, executor)?;
        engine.start();
        Ok(engine)
    }

    /// Start the dispatch loop; no-op if already running or stopped
    pub fn start(&self) {
        debug!("TaskEngine::start: called");
        let mut slot = self
            .shared
            .loop_handle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if slot.is_some() {
            debug!("TaskEngine::start: loop already running");
            return;
        }
        if *self.shared.shutdown_tx.borrow() {
            debug!("TaskEngine::start: engine stopped, not starting loop");
            return;
        }

        let weak = Arc::downgrade(&self.shared);
        let wake = Arc::clone(&self.shared.wake);
        let shutdown_rx = self.shared.shutdown_tx.subscribe();
        let tick = self.shared.config.tick_interval();
        let wake_on_submit = self.shared.config.wake_on_submit;

        *slot = Some(tokio::spawn(dispatch_loop(weak, wake, shutdown_rx, tick, wake_on_submit)));
        info!(
            max_concurrent = self.shared.config.max_concurrent_tasks,
            tick_ms = self.shared.config.tick_interval_ms,
            default_timeout = ?self.shared.config.default_timeout(),
            "TaskEngine started"
        );
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    /// Event bus carrying lifecycle events
    pub fn events(&self) -> &EventBus {
        &self.shared.events
    }

    /// Subscribe to lifecycle events
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<TaskEvent> {
        self.shared.events.subscribe()
    }

    // === Submission & lookup ===

    /// Queue a task and return a handle to its eventual outcome
    pub async fn submit_task(&self, description: TaskDescription) -> Result<TaskHandle, EngineError> {
        debug!(id = ?description.id, description = %description.description, "TaskEngine::submit_task: called");
        let mut guard = self.shared.inner.lock().await;
        let inner = &mut *guard;

        if inner.stopped {
            debug!("TaskEngine::submit_task: engine stopped, rejecting");
            return Err(EngineError::Stopped);
        }
        if let Some(id) = &description.id
            && inner.tasks.contains_key(id)
        {
            debug!(%id, "TaskEngine::submit_task: duplicate id, rejecting");
            return Err(EngineError::DuplicateTask(id.clone()));
        }

        let task = lifecycle::new_task(description, &self.shared.config, Utc::now());
        let id = task.id.clone();
        let (tx, rx) = oneshot::channel();

        inner.queue.enqueue(id.clone(), task.priority);
        inner.stats.record_submitted();
        self.shared.events.submitted(&task);
        debug!(%id, priority = %task.priority, queued = inner.queue.len(), "TaskEngine::submit_task: queued");
        inner.tasks.insert(
            id.clone(),
            TaskRecord {
                task,
                completion: Some(tx),
            },
        );
        drop(guard);

        if self.shared.config.wake_on_submit {
            self.shared.wake.notify_one();
        }

        Ok(TaskHandle { id, rx })
    }

    /// Look up a task snapshot by id
    ///
    /// Searches the active, completed, and failed sets, then the queue.
    pub async fn get_task(&self, id: &str) -> Option<Task> {
        debug!(%id, "TaskEngine::get_task: called");
        let inner = self.shared.inner.lock().await;

        let known = inner.active.contains(id)
            || inner.completed.contains(id)
            || inner.failed.contains(id)
            || inner.queue.contains(|queued| queued == id);

        if known {
            inner.tasks.get(id).map(|record| record.task.clone())
        } else {
            debug!(%id, "TaskEngine::get_task: not found");
            None
        }
    }

    /// Snapshots of every retained task with the given status
    pub async fn tasks_with_status(&self, status: TaskStatus) -> Vec<Task> {
        debug!(%status, "TaskEngine::tasks_with_status: called");
        let inner = self.shared.inner.lock().await;
        let mut tasks: Vec<Task> = inner
            .tasks
            .values()
            .filter(|record| record.task.status == status)
            .map(|record| record.task.clone())
            .collect();
        tasks.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.created_at.cmp(&b.created_at)));
        tasks
    }

    /// Point-in-time statistics
    pub async fn task_stats(&self) -> TaskStats {
        debug!("TaskEngine::task_stats: called");
        let inner = self.shared.inner.lock().await;
        inner.stats.snapshot(
            inner.queue.len(),
            inner.active.len(),
            inner.completed.len(),
            inner.failed.len(),
        )
    }

    /// Record progress for an active task
    ///
    /// Returns `false` (and changes nothing) if the task is unknown or not
    /// currently processing. Percent values above 100 are clamped.
    pub async fn update_task_progress(&self, id: &str, percent: u8, message: Option<String>) -> bool {
        debug!(%id, percent, ?message, "TaskEngine::update_task_progress: called");
        let mut guard = self.shared.inner.lock().await;
        let inner = &mut *guard;

        if !inner.active.contains(id) {
            debug!(%id, "TaskEngine::update_task_progress: task not active");
            return false;
        }
        let Some(record) = inner.tasks.get_mut(id) else {
            return false;
        };
        if record.task.status != TaskStatus::Processing {
            return false;
        }

        record.task.progress = percent.min(100);
        record.task.progress_message = message.clone();
        self.shared.events.progress(&record.task, message);
        true
    }

    // === Dispatch ===

    /// Run one dispatch pass: move up to the free slot count from the queue
    /// to the active set and start their attempts
    ///
    /// Returns the number of tasks dispatched. The dispatch loop calls this
    /// on every tick; hosts may also call it directly.
    pub async fn tick(&self) -> usize {
        run_tick(&self.shared).await
    }

    /// Drain the queue, fail every queued and active task with a shutdown
    /// error, and halt the dispatch loop
    ///
    /// Returns the number of tasks failed by this call.
    pub async fn stop_all_tasks(&self) -> usize {
        debug!("TaskEngine::stop_all_tasks: called");
        self.shared.shutdown_tx.send_replace(true);

        let stopped = {
            let mut guard = self.shared.inner.lock().await;
            let inner = &mut *guard;
            inner.stopped = true;

            let queued = inner.queue.drain_ordered();
            let mut active: Vec<TaskId> = inner.active.drain().collect();
            active.sort();

            let error = TaskError::shutdown(SHUTDOWN_REASON);
            let count = queued.len() + active.len();
            for id in queued.iter().chain(active.iter()) {
                inner.fail_terminal(id, error.clone(), &self.shared.config, &self.shared.events);
            }
            inner.enforce_retention(self.shared.config.retention);

            info!(queued = queued.len(), active = active.len(), "TaskEngine: stopped all tasks");
            count
        };

        let handle = self
            .shared
            .loop_handle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            warn!(error = %e, "TaskEngine::stop_all_tasks: dispatch loop ended abnormally");
        }

        stopped
    }
}

/// Fixed-cadence dispatch loop
///
/// Holds only a weak reference to the engine so that dropping every handle
/// ends the loop.
async fn dispatch_loop(
    shared: Weak<Shared>,
    wake: Arc<Notify>,
    mut shutdown_rx: watch::Receiver<bool>,
    tick: std::time::Duration,
    wake_on_submit: bool,
) {
    debug!(?tick, wake_on_submit, "dispatch_loop: starting");
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    debug!("dispatch_loop: engine dropped");
                    break;
                }
            }
            _ = interval.tick() => {}
            _ = wake.notified(), if wake_on_submit => {
                debug!("dispatch_loop: woken early");
            }
        }

        if *shutdown_rx.borrow() {
            debug!("dispatch_loop: shutdown requested");
            break;
        }

        let Some(shared) = shared.upgrade() else {
            debug!("dispatch_loop: engine dropped");
            break;
        };
        run_tick(&shared).await;
    }

    info!("Dispatch loop halted");
}

/// One dispatch pass (see [`TaskEngine::tick`])
async fn run_tick(shared: &Arc<Shared>) -> usize {
    let batch: Vec<Task> = {
        let mut guard = shared.inner.lock().await;
        let inner = &mut *guard;

        if inner.stopped {
            return 0;
        }

        let available = shared.config.max_concurrent_tasks.saturating_sub(inner.active.len());
        if available == 0 || inner.queue.is_empty() {
            return 0;
        }

        let mut batch = Vec::with_capacity(available.min(inner.queue.len()));
        while batch.len() < available {
            let Some(id) = inner.queue.dequeue() else {
                break;
            };
            let Some(record) = inner.tasks.get_mut(&id) else {
                warn!(%id, "run_tick: queued id missing from arena");
                continue;
            };

            lifecycle::start_attempt(&mut record.task, Utc::now());
            shared.events.started(&record.task);
            batch.push(record.task.clone());
            inner.active.insert(id);
        }

        inner.stats.record_active(inner.active.len());
        debug!(
            dispatched = batch.len(),
            active = inner.active.len(),
            queued = inner.queue.len(),
            next_priority = ?inner.queue.peek_priority(),
            "run_tick: dispatched"
        );
        batch
    };

    let count = batch.len();
    for task in batch {
        let shared = Arc::clone(shared);
        tokio::spawn(async move {
            let id = task.id.clone();
            let attempt = task.attempts;
            let outcome = run_attempt(Arc::clone(&shared.executor), task).await;
            settle_attempt(&shared, &id, attempt, outcome).await;
        });
    }
    count
}

/// Route an attempt's outcome through the lifecycle
///
/// Outcomes for a task that is no longer processing this attempt (already
/// stopped, or evicted) are ignored.
async fn settle_attempt(shared: &Shared, id: &TaskId, attempt: u32, outcome: Result<Value, TaskError>) {
    debug!(%id, attempt, ok = outcome.is_ok(), "settle_attempt: called");
    let mut guard = shared.inner.lock().await;
    let inner = &mut *guard;

    let Some(record) = inner.tasks.get_mut(id) else {
        debug!(%id, "settle_attempt: task no longer retained, ignoring outcome");
        return;
    };
    if record.task.status != TaskStatus::Processing || record.task.attempts != attempt || !inner.active.contains(id)
    {
        debug!(%id, attempt, status = %record.task.status, "settle_attempt: stale outcome ignored");
        return;
    }
    inner.active.remove(id);

    let now = Utc::now();
    match outcome {
        Ok(value) => {
            lifecycle::complete(&mut record.task, value.clone(), now);
            shared.events.completed(&record.task);
            record.settle(Ok(value));
            let elapsed = record.task.processing_time().unwrap_or_default();
            info!(%id, attempts = record.task.attempts, elapsed_ms = elapsed.as_millis() as u64, "Task completed");

            inner.stats.record_completed(elapsed);
            inner.completed.insert(id.clone());
            inner.finished.push_back(id.clone());
        }
        Err(error) => match lifecycle::fail(&mut record.task, error.clone(), &shared.config.retry, now) {
            FailureOutcome::Retry { priority } => {
                warn!(
                    %id,
                    retry = record.task.retry_count,
                    limit = record.task.retry_limit,
                    %priority,
                    error = %error,
                    "Task attempt failed, retrying"
                );
                shared.events.retried(&record.task, error);
                inner.stats.record_retried();
                inner.queue.enqueue(id.clone(), priority);
            }
            FailureOutcome::Failed => {
                warn!(%id, attempts = record.task.attempts, error = %error, "Task failed");
                shared.events.failed(&record.task);
                record.settle(Err(error));

                inner.stats.record_failed();
                inner.failed.insert(id.clone());
                inner.finished.push_back(id.clone());
            }
        },
    }

    inner.enforce_retention(shared.config.retention);
    drop(guard);

    if shared.config.wake_on_submit {
        shared.wake.notify_one();
    }
}
