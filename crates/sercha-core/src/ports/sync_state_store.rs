//! SyncState store port

use async_trait::async_trait;

use crate::domain::SyncState;
use crate::domain::newtypes::SourceId;

use super::error::StoreError;

/// Port for persisting and querying `SyncState` records.
#[async_trait]
pub trait SyncStateStore: Send + Sync {
    /// Upserts the sync state for a source, keyed on `source_id`.
    async fn save(&self, state: &SyncState) -> Result<(), StoreError>;

    /// Retrieves the sync state for a source, or `StoreError::NotFound`
    /// if no sync has ever completed.
    async fn get(&self, source_id: &SourceId) -> Result<SyncState, StoreError>;

    /// Deletes the sync state for a source. Idempotent.
    async fn delete(&self, source_id: &SourceId) -> Result<(), StoreError>;
}
