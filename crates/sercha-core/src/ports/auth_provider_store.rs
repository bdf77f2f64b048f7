//! AuthProvider store port

use async_trait::async_trait;

use crate::domain::AuthProvider;
use crate::domain::newtypes::AuthProviderId;

use super::error::StoreError;

/// Port for persisting `AuthProvider` records.
#[async_trait]
pub trait AuthProviderStore: Send + Sync {
    /// Upserts an auth provider.
    async fn save(&self, provider: &AuthProvider) -> Result<(), StoreError>;

    /// Retrieves an auth provider by id, or `StoreError::NotFound`.
    async fn get(&self, id: &AuthProviderId) -> Result<AuthProvider, StoreError>;

    /// Deletes an auth provider. Refuses with `StoreError::InUse` while
    /// any source still references it.
    async fn delete(&self, id: &AuthProviderId) -> Result<(), StoreError>;

    /// Lists all auth providers.
    async fn list(&self) -> Result<Vec<AuthProvider>, StoreError>;
}
