//! Event Logger - persists engine events to a JSONL file
//!
//! The EventLogger subscribes to the EventBus and appends every event as one
//! JSON line, for history, debugging, and replay.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tokio::sync::broadcast;
use tracing::{debug, error, warn};

use super::bus::EventBus;
use super::types::{EventLogEntry, TaskEvent};

/// Event logger that appends events to a single JSONL file
pub struct EventLogger {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl EventLogger {
    /// Create a logger writing to `path` (opened lazily on first event)
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        debug!(?path, "EventLogger::new: creating logger");
        Self { path, writer: None }
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event to the log
    pub fn write_event(&mut self, event: &TaskEvent) -> eyre::Result<()> {
        debug!(task_id = event.task_id(), event_type = event.event_type(), "EventLogger::write_event");

        if self.writer.is_none() {
            if let Some(parent) = self.path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
            self.writer = Some(BufWriter::new(file));
        }

        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };

        let entry = EventLogEntry::new(event.clone());
        let json = serde_json::to_string(&entry)?;
        writeln!(writer, "{}", json)?;
        writer.flush()?;

        Ok(())
    }

    /// Run the logger, consuming events from the bus until it closes
    ///
    /// This is meant to be spawned as a background task.
    pub async fn run(mut self, mut rx: broadcast::Receiver<TaskEvent>) {
        debug!("EventLogger::run: starting event logger");

        loop {
            match rx.recv().await {
                Ok(event) => {
                    if let Err(e) = self.write_event(&event) {
                        error!(task_id = event.task_id(), error = %e, "EventLogger: failed to write event");
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(missed = n, "EventLogger: lagged behind, missed events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("EventLogger: channel closed, shutting down");
                    break;
                }
            }
        }

        if let Some(mut writer) = self.writer.take() {
            let _ = writer.flush();
        }
    }
}

/// Read all events from a JSONL log file
///
/// Missing files read as empty; malformed lines are skipped with a warning.
pub fn read_events(path: impl AsRef<Path>) -> eyre::Result<Vec<EventLogEntry>> {
    let path = path.as_ref();
    debug!(?path, "read_events: reading log file");

    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path)?;
    let mut entries = Vec::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<EventLogEntry>(line) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                warn!(line, error = %e, "read_events: failed to parse line");
            }
        }
    }

    debug!(count = entries.len(), "read_events: loaded entries");
    Ok(entries)
}

/// Spawn an event logger for `bus` as a background task
///
/// The subscription is taken before returning, so no event emitted after
/// this call is missed.
pub fn spawn_event_logger(bus: &EventBus, path: impl AsRef<Path>) -> tokio::task::JoinHandle<()> {
    let logger = EventLogger::new(path);
    let rx = bus.subscribe();
    tokio::spawn(async move {
        logger.run(rx).await;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Task, TaskDescription};
    use crate::scheduler::{EngineConfig, lifecycle};
    use tempfile::tempdir;

    fn sample_task(id: &str) -> Task {
        lifecycle::new_task(
            TaskDescription::new("sample").with_id(id),
            &EngineConfig::default(),
            chrono::Utc::now(),
        )
    }

    #[test]
    fn test_logger_opens_lazily() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("events.jsonl");
        let logger = EventLogger::new(&path);
        assert_eq!(logger.path(), path.as_path());
        assert!(!path.exists());
    }

    #[test]
    fn test_write_and_read_events() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("nested").join("events.jsonl");
        let mut logger = EventLogger::new(&path);
        let task = sample_task("log-1");

        logger.write_event(&TaskEvent::TaskSubmitted { task: task.clone() }).unwrap();
        logger.write_event(&TaskEvent::TaskStarted { task: task.clone() }).unwrap();
        logger.write_event(&TaskEvent::TaskCompleted { task }).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 3);

        let entries = read_events(&path).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].event.event_type(), "TaskSubmitted");
        assert_eq!(entries[2].event.event_type(), "TaskCompleted");
        assert_eq!(entries[1].event.task_id(), "log-1");
    }

    #[test]
    fn test_read_nonexistent_file() {
        let temp = tempdir().unwrap();
        let entries = read_events(temp.path().join("missing.jsonl")).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_read_skips_malformed_lines() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("events.jsonl");
        let mut logger = EventLogger::new(&path);
        logger
            .write_event(&TaskEvent::TaskSubmitted {
                task: sample_task("ok"),
            })
            .unwrap();

        let mut content = fs::read_to_string(&path).unwrap();
        content.push_str("not json\n\n");
        fs::write(&path, content).unwrap();

        let entries = read_events(&path).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_spawned_logger_writes_until_bus_dropped() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("events.jsonl");
        let bus = EventBus::new(16);
        let handle = spawn_event_logger(&bus, &path);

        bus.submitted(&sample_task("spawned"));
        bus.failed(&sample_task("spawned"));
        drop(bus);

        handle.await.unwrap();
        let entries = read_events(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].event.event_type(), "TaskFailed");
    }
}
