//! Embedded metadata store
//!
//! A single SQLite database file backs seven logical stores (`Source`,
//! `SyncState`, `Document`/`Chunk`, `Exclusion`, `Scheduler`,
//! `AuthProvider`, `Credentials`). [`MetadataStore`] owns the connection
//! pool and hands out one thin struct per port, each implementing the
//! corresponding trait from `sercha_core::ports`.

mod auth_providers;
mod credentials;
mod documents;
mod exclusions;
mod migrations;
mod pool;
mod scheduler;
mod sources;
mod sync_state;
mod util;

pub use pool::DatabasePool;

use std::path::Path;

use sercha_core::ports::StoreError;

use auth_providers::SqliteAuthProviderStore;
use credentials::SqliteCredentialsStore;
use documents::SqliteDocumentStore;
use exclusions::SqliteExclusionStore;
use scheduler::SqliteSchedulerStore;
use sources::SqliteSourceStore;
use sync_state::SqliteSyncStateStore;

/// Owns the metadata database and hands out one store per logical port.
#[derive(Clone)]
pub struct MetadataStore {
    pool: DatabasePool,
}

impl MetadataStore {
    /// Opens the store at `db_path`, running migrations if needed.
    pub async fn open(db_path: &Path) -> Result<Self, StoreError> {
        Ok(Self {
            pool: DatabasePool::open(db_path).await?,
        })
    }

    /// Opens an in-memory store, for tests.
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self {
            pool: DatabasePool::open_in_memory().await?,
        })
    }

    /// The `SourceStore` port.
    #[must_use]
    pub fn sources(&self) -> SqliteSourceStore {
        SqliteSourceStore::new(self.pool.pool().clone())
    }

    /// The `SyncStateStore` port.
    #[must_use]
    pub fn sync_state(&self) -> SqliteSyncStateStore {
        SqliteSyncStateStore::new(self.pool.pool().clone())
    }

    /// The `DocumentStore` port.
    #[must_use]
    pub fn documents(&self) -> SqliteDocumentStore {
        SqliteDocumentStore::new(self.pool.pool().clone())
    }

    /// The `ExclusionStore` port.
    #[must_use]
    pub fn exclusions(&self) -> SqliteExclusionStore {
        SqliteExclusionStore::new(self.pool.pool().clone())
    }

    /// The `SchedulerStore` port.
    #[must_use]
    pub fn scheduler(&self) -> SqliteSchedulerStore {
        SqliteSchedulerStore::new(self.pool.pool().clone())
    }

    /// The `AuthProviderStore` port.
    #[must_use]
    pub fn auth_providers(&self) -> SqliteAuthProviderStore {
        SqliteAuthProviderStore::new(self.pool.pool().clone())
    }

    /// The `CredentialsStore` port.
    #[must_use]
    pub fn credentials(&self) -> SqliteCredentialsStore {
        SqliteCredentialsStore::new(self.pool.pool().clone())
    }
}
