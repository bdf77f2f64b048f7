//! SyncState domain entity
//!
//! Tracks the opaque, versioned cursor a connector needs to resume an
//! incremental sync, and the timestamp of the last successful run.
//! Exactly one `SyncState` exists per `Source` once a sync has completed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::SourceId;

/// Per-source synchronisation progress.
///
/// `cursor` is the base64-encoded, versioned record produced by
/// `sercha-cursor`; this crate treats it as an opaque string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    /// The source this state belongs to.
    pub source_id: SourceId,
    /// Opaque, versioned cursor bytes (URL-safe base64 text).
    pub cursor: String,
    /// When this sync state was last committed.
    pub last_sync: DateTime<Utc>,
}

impl SyncState {
    /// Builds a fresh sync state with `last_sync` set to `now`.
    #[must_use]
    pub fn new(source_id: SourceId, cursor: impl Into<String>) -> Self {
        Self {
            source_id,
            cursor: cursor.into(),
            last_sync: Utc::now(),
        }
    }
}
