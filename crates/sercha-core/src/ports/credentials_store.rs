//! Credentials store port

use async_trait::async_trait;

use crate::domain::Credentials;
use crate::domain::newtypes::{CredentialsId, SourceId};

use super::error::StoreError;

/// Port for persisting `Credentials` records.
#[async_trait]
pub trait CredentialsStore: Send + Sync {
    /// Upserts a credentials record.
    async fn save(&self, credentials: &Credentials) -> Result<(), StoreError>;

    /// Retrieves credentials by id, or `StoreError::NotFound`.
    async fn get(&self, id: &CredentialsId) -> Result<Credentials, StoreError>;

    /// Retrieves the credentials for a source, if any. Returns `Ok(None)`
    /// rather than an error when the source has no credentials.
    async fn get_by_source_id(
        &self,
        source_id: &SourceId,
    ) -> Result<Option<Credentials>, StoreError>;

    /// Deletes a credentials record. Idempotent.
    async fn delete(&self, id: &CredentialsId) -> Result<(), StoreError>;
}
