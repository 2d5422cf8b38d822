//! Priority levels for task scheduling

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Task priority in the range `1..=10`, where 10 is the most urgent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Priority(u8);

impl Priority {
    /// Least urgent priority
    pub const MIN: Priority = Priority(1);

    /// Most urgent priority
    pub const MAX: Priority = Priority(10);

    /// Create a priority, rejecting values outside `1..=10`
    pub fn new(value: u8) -> Result<Self, EngineError> {
        if (Self::MIN.0..=Self::MAX.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(EngineError::InvalidPriority(value))
        }
    }

    /// Raw priority value
    pub fn value(self) -> u8 {
        self.0
    }

    /// Raise the priority by `step`, never going above `cap`
    pub fn escalate(self, step: u8, cap: Priority) -> Priority {
        if self.0 >= cap.0 {
            return self;
        }
        Priority(self.0.saturating_add(step).min(cap.0))
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self(5)
    }
}

impl TryFrom<u8> for Priority {
    type Error = EngineError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Priority> for u8 {
    fn from(priority: Priority) -> Self {
        priority.0
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Priority {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u8 = s
            .trim()
            .parse()
            .map_err(|_| EngineError::InvalidPriorityText(s.to_string()))?;
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_range() {
        assert!(Priority::new(0).is_err());
        assert!(Priority::new(11).is_err());
        assert_eq!(Priority::new(1).unwrap(), Priority::MIN);
        assert_eq!(Priority::new(10).unwrap(), Priority::MAX);
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::new(3).unwrap() < Priority::new(4).unwrap());
        assert!(Priority::MIN < Priority::default());
        assert!(Priority::default() < Priority::MAX);
    }

    #[test]
    fn test_priority_escalate_caps_at_max() {
        let p = Priority::new(9).unwrap();
        assert_eq!(p.escalate(1, Priority::MAX).value(), 10);
        assert_eq!(Priority::MAX.escalate(1, Priority::MAX), Priority::MAX);
        assert_eq!(p.escalate(5, Priority::MAX), Priority::MAX);
    }

    #[test]
    fn test_priority_escalate_respects_lower_cap() {
        let cap = Priority::new(6).unwrap();
        assert_eq!(Priority::new(5).unwrap().escalate(3, cap), cap);
        // A task already above the cap is never demoted
        assert_eq!(Priority::new(8).unwrap().escalate(1, cap).value(), 8);
    }

    #[test]
    fn test_priority_parse() {
        assert_eq!("7".parse::<Priority>().unwrap().value(), 7);
        assert_eq!(" 2 ".parse::<Priority>().unwrap().value(), 2);
        assert!("high".parse::<Priority>().is_err());
        assert!("42".parse::<Priority>().is_err());
    }

    #[test]
    fn test_priority_serde() {
        let json = serde_json::to_string(&Priority::new(8).unwrap()).unwrap();
        assert_eq!(json, "8");

        let priority: Priority = serde_json::from_str("3").unwrap();
        assert_eq!(priority.value(), 3);

        assert!(serde_json::from_str::<Priority>("0").is_err());
    }
}
