//! SQLite implementation of `SchedulerStore`

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

use sercha_core::domain::newtypes::TaskId;
use sercha_core::domain::{ScheduledTask, TaskResult};
use sercha_core::ports::{SchedulerStore, StoreError};

use crate::util::{backend, decode_id};

/// SQLite-backed `SchedulerStore`.
pub struct SqliteSchedulerStore {
    pool: SqlitePool,
}

impl SqliteSchedulerStore {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_task(row: &SqliteRow) -> Result<ScheduledTask, StoreError> {
    let id: String = row.get("id");
    Ok(ScheduledTask {
        id: decode_id("scheduled_task.id", id, TaskId::new)?,
        name: row.get("name"),
        interval_secs: row.get("interval_secs"),
        last_run: row.get::<Option<DateTime<Utc>>, _>("last_run"),
        next_run: row.get::<Option<DateTime<Utc>>, _>("next_run"),
        last_error: row.get("last_error"),
        last_success: row.get::<Option<DateTime<Utc>>, _>("last_success"),
        enabled: row.get::<i64, _>("enabled") != 0,
    })
}

fn row_to_result(row: &SqliteRow) -> Result<TaskResult, StoreError> {
    let task_id: String = row.get("task_id");
    Ok(TaskResult {
        task_id: decode_id("task_result.task_id", task_id, TaskId::new)?,
        started_at: row.get::<DateTime<Utc>, _>("started_at"),
        ended_at: row.get::<DateTime<Utc>, _>("ended_at"),
        success: row.get::<i64, _>("success") != 0,
        error: row.get("error"),
        items_processed: u64::try_from(row.get::<i64, _>("items_processed")).unwrap_or(0),
    })
}

#[async_trait]
impl SchedulerStore for SqliteSchedulerStore {
    async fn save_task(&self, task: &ScheduledTask) -> Result<(), StoreError> {
        if task.id.as_str().trim().is_empty() {
            return Err(StoreError::InvalidInput("task id must not be empty".into()));
        }

        sqlx::query(
            "INSERT INTO scheduled_tasks \
             (id, name, interval_secs, last_run, next_run, last_error, last_success, enabled) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
               name = excluded.name, \
               interval_secs = excluded.interval_secs, \
               last_run = excluded.last_run, \
               next_run = excluded.next_run, \
               last_error = excluded.last_error, \
               last_success = excluded.last_success, \
               enabled = excluded.enabled",
        )
        .bind(task.id.as_str())
        .bind(&task.name)
        .bind(task.interval_secs)
        .bind(task.last_run)
        .bind(task.next_run)
        .bind(&task.last_error)
        .bind(task.last_success)
        .bind(i64::from(task.enabled))
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn get_task(&self, id: &TaskId) -> Result<ScheduledTask, StoreError> {
        let row = sqlx::query("SELECT * FROM scheduled_tasks WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        match row {
            Some(row) => row_to_task(&row),
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete_task(&self, id: &TaskId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM scheduled_tasks WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn list_tasks(&self) -> Result<Vec<ScheduledTask>, StoreError> {
        let rows = sqlx::query("SELECT * FROM scheduled_tasks ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.iter().map(row_to_task).collect()
    }

    async fn record_result(&self, result: &TaskResult) -> Result<(), StoreError> {
        if result.task_id.as_str().trim().is_empty() {
            return Err(StoreError::InvalidInput("task id must not be empty".into()));
        }

        sqlx::query(
            "INSERT INTO task_results (task_id, started_at, ended_at, success, error, items_processed) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(result.task_id.as_str())
        .bind(result.started_at)
        .bind(result.ended_at)
        .bind(i64::from(result.success))
        .bind(&result.error)
        .bind(i64::try_from(result.items_processed).unwrap_or(i64::MAX))
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn get_task_history(&self, task_id: &TaskId, limit: u32) -> Result<Vec<TaskResult>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM task_results WHERE task_id = ? ORDER BY started_at DESC LIMIT ?",
        )
        .bind(task_id.as_str())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        rows.iter().map(row_to_result).collect()
    }

    async fn prune_history(&self, keep: u32) -> Result<(), StoreError> {
        sqlx::query(
            "DELETE FROM task_results WHERE row_id NOT IN ( \
               SELECT row_id FROM ( \
                 SELECT row_id, ROW_NUMBER() OVER ( \
                   PARTITION BY task_id ORDER BY started_at DESC \
                 ) AS rn FROM task_results \
               ) WHERE rn <= ? \
             )",
        )
        .bind(i64::from(keep))
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }
}
