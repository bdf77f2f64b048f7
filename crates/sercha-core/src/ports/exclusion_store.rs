//! Exclusion store port

use async_trait::async_trait;

use crate::domain::Exclusion;
use crate::domain::newtypes::{ExclusionId, SourceId, Uri};

use super::error::StoreError;

/// Port for persisting and querying `Exclusion` records.
#[async_trait]
pub trait ExclusionStore: Send + Sync {
    /// Adds an exclusion.
    async fn add(&self, exclusion: &Exclusion) -> Result<(), StoreError>;

    /// Removes an exclusion by id. Idempotent.
    async fn remove(&self, id: &ExclusionId) -> Result<(), StoreError>;

    /// Lists all exclusions for a source.
    async fn get_by_source_id(&self, source_id: &SourceId) -> Result<Vec<Exclusion>, StoreError>;

    /// Returns true if `(source_id, uri)` is excluded. Implementations
    /// must use a presence count and never load full rows.
    async fn is_excluded(&self, source_id: &SourceId, uri: &Uri) -> Result<bool, StoreError>;

    /// Lists all exclusions.
    async fn list(&self) -> Result<Vec<Exclusion>, StoreError>;
}
