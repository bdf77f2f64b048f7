//! Source domain entity
//!
//! A `Source` is a user-configured instance of a provider: one code-host
//! account, one mailbox, one drive, one calendar. Deleting a `Source`
//! cascades to everything it exclusively owns (`SyncState`, `Document`,
//! `Chunk`, `Exclusion`, `Credentials`).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{AuthProviderId, CredentialsId, SourceId};

/// A user-configured instance of a connector provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Stable identifier, unique across all sources.
    pub id: SourceId,
    /// Provider type tag (e.g. `"github"`, `"gmail"`); must match a
    /// registered connector.
    pub source_type: String,
    /// Human-readable name.
    pub name: String,
    /// Free-form string configuration (filters, content-type selection,
    /// base URLs, ...).
    pub configuration: HashMap<String, String>,
    /// Shared auth provider this source authenticates through, if any.
    pub auth_provider_id: Option<AuthProviderId>,
    /// This source's stored credentials, if any.
    pub credentials_id: Option<CredentialsId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Source {
    /// Builds a new source with `created_at`/`updated_at` set to `now`.
    #[must_use]
    pub fn new(id: SourceId, source_type: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            source_type: source_type.into(),
            name: name.into(),
            configuration: HashMap::new(),
            auth_provider_id: None,
            credentials_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns a configuration value by key.
    #[must_use]
    pub fn config(&self, key: &str) -> Option<&str> {
        self.configuration.get(key).map(String::as_str)
    }
}
