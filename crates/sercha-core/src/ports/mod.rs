//! Driven ports: the seven logical metadata stores
//!
//! Each port is a small trait, not an inheritance hierarchy. Their single
//! implementation (`sercha-store::Store`) hands out one struct per port,
//! each holding the database connection pool by back-reference.

pub mod auth_provider_store;
pub mod credentials_store;
pub mod document_store;
pub mod error;
pub mod exclusion_store;
pub mod scheduler_store;
pub mod source_store;
pub mod sync_state_store;

pub use auth_provider_store::AuthProviderStore;
pub use credentials_store::CredentialsStore;
pub use document_store::DocumentStore;
pub use error::StoreError;
pub use exclusion_store::ExclusionStore;
pub use scheduler_store::SchedulerStore;
pub use source_store::SourceStore;
pub use sync_state_store::SyncStateStore;
