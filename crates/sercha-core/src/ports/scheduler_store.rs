//! Scheduler store port

use async_trait::async_trait;

use crate::domain::{ScheduledTask, TaskResult};
use crate::domain::newtypes::TaskId;

use super::error::StoreError;

/// Port for persisting `ScheduledTask` records and their run history.
#[async_trait]
pub trait SchedulerStore: Send + Sync {
    /// Upserts a task.
    async fn save_task(&self, task: &ScheduledTask) -> Result<(), StoreError>;

    /// Retrieves a task by id, or `StoreError::NotFound`.
    async fn get_task(&self, id: &TaskId) -> Result<ScheduledTask, StoreError>;

    /// Deletes a task, cascading to its history. Idempotent.
    async fn delete_task(&self, id: &TaskId) -> Result<(), StoreError>;

    /// Lists all tasks.
    async fn list_tasks(&self) -> Result<Vec<ScheduledTask>, StoreError>;

    /// Appends an immutable task result.
    async fn record_result(&self, result: &TaskResult) -> Result<(), StoreError>;

    /// Returns up to `limit` results for a task, ordered by
    /// `started_at` descending.
    async fn get_task_history(
        &self,
        task_id: &TaskId,
        limit: u32,
    ) -> Result<Vec<TaskResult>, StoreError>;

    /// Retains the `keep` most recent results (by `started_at`) for
    /// every task, deleting the rest.
    async fn prune_history(&self, keep: u32) -> Result<(), StoreError>;
}
