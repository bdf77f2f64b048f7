//! SQLite implementation of `SyncStateStore`

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

use sercha_core::domain::SyncState;
use sercha_core::domain::newtypes::SourceId;
use sercha_core::ports::{StoreError, SyncStateStore};

use crate::util::{backend, decode_id};

/// SQLite-backed `SyncStateStore`.
pub struct SqliteSyncStateStore {
    pool: SqlitePool,
}

impl SqliteSyncStateStore {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_state(row: &SqliteRow) -> Result<SyncState, StoreError> {
    let source_id: String = row.get("source_id");
    Ok(SyncState {
        source_id: decode_id("sync_state.source_id", source_id, SourceId::new)?,
        cursor: row.get("cursor"),
        last_sync: row.get::<DateTime<Utc>, _>("last_sync"),
    })
}

#[async_trait]
impl SyncStateStore for SqliteSyncStateStore {
    async fn save(&self, state: &SyncState) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO sync_state (source_id, cursor, last_sync) VALUES (?, ?, ?) \
             ON CONFLICT(source_id) DO UPDATE SET cursor = excluded.cursor, last_sync = excluded.last_sync",
        )
        .bind(state.source_id.as_str())
        .bind(&state.cursor)
        .bind(state.last_sync)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn get(&self, source_id: &SourceId) -> Result<SyncState, StoreError> {
        let row = sqlx::query("SELECT * FROM sync_state WHERE source_id = ?")
            .bind(source_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        match row {
            Some(row) => row_to_state(&row),
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete(&self, source_id: &SourceId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM sync_state WHERE source_id = ?")
            .bind(source_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }
}
