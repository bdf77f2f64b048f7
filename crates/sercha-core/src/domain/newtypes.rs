//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for the stable string identifiers that flow
//! through the connector runtime. Each newtype validates non-emptiness at
//! construction time so an empty id can never silently reach a store.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;

macro_rules! string_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new id, rejecting an empty string.
            pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
                let value = value.into();
                if value.trim().is_empty() {
                    return Err(DomainError::InvalidId(format!(
                        "{} must not be empty",
                        stringify!($name)
                    )));
                }
                Ok(Self(value))
            }

            /// Generates a new id from a random UUID.
            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Returns the underlying string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the id, returning the underlying string.
            #[must_use]
            pub fn into_string(self) -> String {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(SourceId, "Stable identifier for a configured `Source`.");
string_id!(DocumentId, "Stable identifier for an ingested `Document`.");
string_id!(ChunkId, "Stable identifier for a `Chunk` of a document.");
string_id!(ExclusionId, "Stable identifier for an `Exclusion` record.");
string_id!(TaskId, "Stable identifier for a `ScheduledTask`.");
string_id!(AuthProviderId, "Stable identifier for an `AuthProvider`.");
string_id!(CredentialsId, "Stable identifier for a `Credentials` record.");

/// A stable, provider-specific document identifier (not a URL).
///
/// Each provider family uses its own scheme: `gh://`, `mail://`,
/// `drive://`, `cal://`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uri(String);

impl Uri {
    /// Creates a new URI, rejecting an empty string.
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(DomainError::InvalidUri("uri must not be empty".into()));
        }
        Ok(Self(value))
    }

    /// Returns the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Uri {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
