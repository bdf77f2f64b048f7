//! ScheduledTask and TaskResult domain entities
//!
//! Cron *arithmetic* (computing the next fire time) is an excluded
//! collaborator; this module only models the persisted task record and
//! its immutable run history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::TaskId;

/// A schedulable, recurring unit of work (typically "sync this source").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTask {
    /// Stable identifier.
    pub id: TaskId,
    /// Human-readable name.
    pub name: String,
    /// Interval between runs, in whole seconds. Must be positive.
    pub interval_secs: i64,
    /// Timestamp of the most recent run, if any.
    pub last_run: Option<DateTime<Utc>>,
    /// Timestamp the task is next due to run, if scheduled.
    pub next_run: Option<DateTime<Utc>>,
    /// Error message from the most recent failed run, if any.
    pub last_error: Option<String>,
    /// Timestamp of the most recent successful run, if any.
    pub last_success: Option<DateTime<Utc>>,
    /// Whether the task is currently enabled.
    pub enabled: bool,
}

impl ScheduledTask {
    /// Builds a new enabled task with the given interval.
    pub fn new(
        id: TaskId,
        name: impl Into<String>,
        interval_secs: i64,
    ) -> Result<Self, DomainError> {
        if interval_secs <= 0 {
            return Err(DomainError::InvalidInterval(format!(
                "interval must be positive, got {interval_secs}"
            )));
        }
        Ok(Self {
            id,
            name: name.into(),
            interval_secs,
            last_run: None,
            next_run: None,
            last_error: None,
            last_success: None,
            enabled: true,
        })
    }
}

/// An immutable record of one completed task run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    /// The task this result belongs to.
    pub task_id: TaskId,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run ended.
    pub ended_at: DateTime<Utc>,
    /// Whether the run succeeded.
    pub success: bool,
    /// Error message, if the run failed.
    pub error: Option<String>,
    /// Number of items processed during the run.
    pub items_processed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_interval() {
        assert!(ScheduledTask::new(TaskId::generate(), "t", 0).is_err());
        assert!(ScheduledTask::new(TaskId::generate(), "t", -1).is_err());
        assert!(ScheduledTask::new(TaskId::generate(), "t", 60).is_ok());
    }
}
