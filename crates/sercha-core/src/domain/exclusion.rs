//! Exclusion domain entity
//!
//! A user-declared `(source, uri)` pair whose documents must never be
//! persisted by the sync engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{DocumentId, ExclusionId, SourceId, Uri};

/// A user-declared exclusion of a specific URI within a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exclusion {
    /// Stable identifier.
    pub id: ExclusionId,
    /// Source the exclusion applies to.
    pub source_id: SourceId,
    /// The excluded document, if one was ever ingested.
    pub document_id: Option<DocumentId>,
    /// URI being excluded; `(source_id, uri)` is the lookup key.
    pub uri: Uri,
    /// User-supplied reason.
    pub reason: String,
    /// When the exclusion was recorded.
    pub excluded_at: DateTime<Utc>,
}

impl Exclusion {
    /// Builds a new exclusion with `excluded_at` set to `now`.
    #[must_use]
    pub fn new(
        id: ExclusionId,
        source_id: SourceId,
        uri: Uri,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            id,
            source_id,
            document_id: None,
            uri,
            reason: reason.into(),
            excluded_at: Utc::now(),
        }
    }
}
