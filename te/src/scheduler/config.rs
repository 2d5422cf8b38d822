//! Engine configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::Priority;
use crate::error::EngineError;

use super::lifecycle::RetryPolicy;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Max tasks executing at once
    #[serde(default = "default_max_concurrent_tasks")]
    pub max_concurrent_tasks: usize,

    /// Dispatch loop cadence in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Per-attempt timeout for tasks that don't set one
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,

    /// Retry budget for tasks that don't set one
    #[serde(default = "default_retry_limit")]
    pub default_retry_limit: u32,

    /// Priority for tasks that don't set one
    #[serde(default)]
    pub default_priority: Priority,

    /// Also run a dispatch pass as soon as a task is submitted or finishes
    #[serde(default)]
    pub wake_on_submit: bool,

    /// Broadcast channel capacity for engine events
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Max finished (completed + failed) tasks kept for lookup; None keeps all
    #[serde(default)]
    pub retention: Option<usize>,

    /// Priority escalation on retry
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_max_concurrent_tasks() -> usize {
    5
}

fn default_tick_interval_ms() -> u64 {
    100
}

fn default_timeout_ms() -> u64 {
    300_000
}

fn default_retry_limit() -> u32 {
    3
}

fn default_event_capacity() -> usize {
    1024
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: default_max_concurrent_tasks(),
            tick_interval_ms: default_tick_interval_ms(),
            default_timeout_ms: default_timeout_ms(),
            default_retry_limit: default_retry_limit(),
            default_priority: Priority::default(),
            wake_on_submit: false,
            event_capacity: default_event_capacity(),
            retention: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Dispatch cadence as a Duration
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Default per-attempt timeout as a Duration
    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.max_concurrent_tasks == 0 {
            return Err(EngineError::InvalidConfig(
                "max_concurrent_tasks must be at least 1".to_string(),
            ));
        }
        if self.tick_interval_ms == 0 {
            return Err(EngineError::InvalidConfig(
                "tick_interval_ms must be at least 1".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(EngineError::InvalidConfig("event_capacity must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.max_concurrent_tasks, 5);
        assert_eq!(config.tick_interval_ms, 100);
        assert_eq!(config.default_timeout_ms, 300_000);
        assert_eq!(config.default_retry_limit, 3);
        assert_eq!(config.default_priority.value(), 5);
        assert!(!config.wake_on_submit);
        assert_eq!(config.retention, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_durations() {
        let config = EngineConfig {
            tick_interval_ms: 20,
            default_timeout_ms: 1500,
            ..Default::default()
        };
        assert_eq!(config.tick_interval(), Duration::from_millis(20));
        assert_eq!(config.default_timeout(), Duration::from_millis(1500));
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let config = EngineConfig {
            max_concurrent_tasks: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = EngineConfig {
            tick_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "max_concurrent_tasks: 2\nretry:\n  escalation_step: 2\n";
        let config: EngineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.max_concurrent_tasks, 2);
        assert_eq!(config.tick_interval_ms, 100);
        assert_eq!(config.retry.escalation_step, 2);
        assert_eq!(config.retry.max_priority, Priority::MAX);
    }
}
