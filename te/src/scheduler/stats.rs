//! Aggregate statistics for the engine

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Historical counters, updated on submission and terminal transitions
#[derive(Debug, Default, Clone)]
pub struct StatsTracker {
    pub total_submitted: u64,
    pub total_completed: u64,
    pub total_failed: u64,
    pub total_retried: u64,
    pub peak_active: usize,
    average_processing_ms: f64,
}

impl StatsTracker {
    pub fn record_submitted(&mut self) {
        self.total_submitted += 1;
    }

    /// Count a completion and fold its processing time into the running average
    pub fn record_completed(&mut self, processing_time: Duration) {
        self.total_completed += 1;
        let n = self.total_completed as f64;
        let sample = processing_time.as_secs_f64() * 1000.0;
        self.average_processing_ms = (self.average_processing_ms * (n - 1.0) + sample) / n;
    }

    pub fn record_failed(&mut self) {
        self.total_failed += 1;
    }

    pub fn record_retried(&mut self) {
        self.total_retried += 1;
    }

    pub fn record_active(&mut self, active: usize) {
        self.peak_active = self.peak_active.max(active);
    }

    /// Mean processing time of completed tasks, in milliseconds
    pub fn average_processing_ms(&self) -> f64 {
        self.average_processing_ms
    }
}

/// Point-in-time statistics snapshot
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStats {
    pub total_submitted: u64,
    pub total_completed: u64,
    pub total_failed: u64,
    pub total_retried: u64,
    pub average_processing_time_ms: f64,
    pub peak_active: usize,

    /// Tasks waiting in the queue
    pub queued: usize,
    /// Tasks currently executing
    pub active: usize,
    /// Completed tasks still retained
    pub completed: usize,
    /// Failed tasks still retained
    pub failed: usize,
}

impl StatsTracker {
    /// Combine the counters with live collection sizes
    pub fn snapshot(&self, queued: usize, active: usize, completed: usize, failed: usize) -> TaskStats {
        TaskStats {
            total_submitted: self.total_submitted,
            total_completed: self.total_completed,
            total_failed: self.total_failed,
            total_retried: self.total_retried,
            average_processing_time_ms: self.average_processing_ms,
            peak_active: self.peak_active,
            queued,
            active,
            completed,
            failed,
        }
    }
}
