//! Source store port

use async_trait::async_trait;

use crate::domain::Source;
use crate::domain::newtypes::SourceId;

use super::error::StoreError;

/// Port for persisting and querying `Source` records.
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Upserts a source. Sets `created_at` if this is the first save;
    /// always refreshes `updated_at` to now.
    async fn save(&self, source: &Source) -> Result<(), StoreError>;

    /// Retrieves a source by id, or `StoreError::NotFound`.
    async fn get(&self, id: &SourceId) -> Result<Source, StoreError>;

    /// Deletes a source, cascading to its owned records. Idempotent.
    async fn delete(&self, id: &SourceId) -> Result<(), StoreError>;

    /// Lists all sources.
    async fn list(&self) -> Result<Vec<Source>, StoreError>;
}
