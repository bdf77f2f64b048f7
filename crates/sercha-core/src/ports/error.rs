//! Metadata store error taxonomy
//!
//! Shared between the port traits (this crate) and their SQLite
//! implementation (`sercha-store`), so trait signatures can be typed
//! precisely instead of returning `anyhow::Error`.

use thiserror::Error;

/// Errors surfaced by any of the seven metadata store ports.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested record does not exist.
    #[error("not found")]
    NotFound,
    /// A required identity field was missing or empty.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A delete was refused because other records still reference it.
    #[error("{what} is referenced by {count} other record(s)")]
    InUse {
        /// Description of the record that could not be deleted.
        what: String,
        /// Number of referencing records.
        count: u64,
    },
    /// A stored JSON/text column could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
    /// The underlying database backend failed.
    #[error("store backend error: {0}")]
    Backend(#[source] anyhow::Error),
}

impl StoreError {
    /// True for `NotFound`.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// True for `InvalidInput`.
    #[must_use]
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }

    /// True for `InUse`.
    #[must_use]
    pub fn is_in_use(&self) -> bool {
        matches!(self, Self::InUse { .. })
    }
}
