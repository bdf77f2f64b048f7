//! Cursor codec
//!
//! Cursors are provider-specific but share a wrapper discipline: each
//! carries an integer `version` field and the provider's state. Encoding
//! is URL-safe base64 of the structured JSON record; decoding is forgiving
//! of an empty input (yields a fresh zero-valued cursor), rejects unknown
//! future versions, and tolerates missing optional fields via
//! `#[serde(default)]`.
//!
//! Two canonical shapes ship, following the same versioned-newtype
//! discipline as a Graph-style delta token:
//!
//! - [`RepoMapCursor`] — per-repository progress map, for providers that
//!   expose many independent top-level containers (code hosts).
//! - [`PageTokenCursor`] / [`HistoryIdCursor`] — a single global token,
//!   for providers with one change log (drives, calendars, mailboxes).

use std::collections::HashMap;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

/// Errors from the cursor codec.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CursorError {
    /// The cursor was malformed or carried an unrecognised future
    /// version. The sync engine treats this the same as "no prior
    /// state": it performs a full sync and logs the transition.
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
}

/// Encodes any serializable cursor record as URL-safe base64 JSON.
pub fn encode<T: Serialize>(cursor: &T) -> String {
    let json = serde_json::to_vec(cursor).expect("cursor types are always serializable");
    URL_SAFE_NO_PAD.encode(json)
}

/// Decodes a cursor record, forgiving of an empty `encoded` string
/// (returns `T::default()`) and rejecting any version greater than
/// `max_version`.
pub fn decode<T>(encoded: &str, max_version: u32, version_of: impl Fn(&T) -> u32) -> Result<T, CursorError>
where
    T: DeserializeOwned + Default,
{
    if encoded.is_empty() {
        return Ok(T::default());
    }
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded)
        .map_err(|e| CursorError::InvalidCursor(e.to_string()))?;
    let value: T = serde_json::from_slice(&bytes)
        .map_err(|e| CursorError::InvalidCursor(e.to_string()))?;
    let version = version_of(&value);
    if version > max_version {
        return Err(CursorError::InvalidCursor(format!(
            "unknown cursor version {version}, max supported is {max_version}"
        )));
    }
    Ok(value)
}

/// Current version for [`RepoMapCursor`].
pub const REPO_MAP_CURSOR_VERSION: u32 = 1;

/// Per-repository sync progress for one container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, serde::Deserialize)]
pub struct RepoProgress {
    /// SHA of the files tree last observed for this repository.
    #[serde(default)]
    pub files_tree_sha: Option<String>,
    /// Timestamp the issue list was last synced through.
    #[serde(default)]
    pub issues_since: Option<chrono::DateTime<chrono::Utc>>,
    /// Timestamp the pull request list was last synced through.
    #[serde(default)]
    pub prs_since: Option<chrono::DateTime<chrono::Utc>>,
    /// SHA of the wiki commit last observed for this repository.
    #[serde(default)]
    pub wiki_commit_sha: Option<String>,
}

/// Cursor shape for providers exposing many independent top-level
/// containers (e.g. one entry per code-host repository).
#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
pub struct RepoMapCursor {
    /// Cursor wrapper version.
    pub version: u32,
    /// Per-repository progress, keyed by `"owner/name"`. A `None` inner
    /// map on deserialize is normalised to an empty map.
    #[serde(default)]
    pub repos: HashMap<String, RepoProgress>,
}

impl Default for RepoMapCursor {
    fn default() -> Self {
        Self {
            version: REPO_MAP_CURSOR_VERSION,
            repos: HashMap::new(),
        }
    }
}

impl RepoMapCursor {
    /// Encodes this cursor as URL-safe base64 JSON.
    #[must_use]
    pub fn encode(&self) -> String {
        encode(self)
    }

    /// Decodes a cursor previously produced by [`RepoMapCursor::encode`].
    pub fn decode(encoded: &str) -> Result<Self, CursorError> {
        decode(encoded, REPO_MAP_CURSOR_VERSION, |c: &RepoMapCursor| c.version)
    }
}

/// Current version for [`PageTokenCursor`].
pub const PAGE_TOKEN_CURSOR_VERSION: u32 = 1;

/// Cursor shape for providers exposing a single global change log via a
/// page/continuation token (drives, calendars).
#[derive(Debug, Clone, Default, PartialEq, Serialize, serde::Deserialize)]
pub struct PageTokenCursor {
    /// Cursor wrapper version.
    pub version: u32,
    /// Provider continuation token for the next delta query.
    #[serde(default)]
    pub page_token: Option<String>,
}

impl PageTokenCursor {
    /// Encodes this cursor as URL-safe base64 JSON.
    #[must_use]
    pub fn encode(&self) -> String {
        encode(self)
    }

    /// Decodes a cursor previously produced by [`PageTokenCursor::encode`].
    pub fn decode(encoded: &str) -> Result<Self, CursorError> {
        decode(encoded, PAGE_TOKEN_CURSOR_VERSION, |c: &PageTokenCursor| {
            c.version
        })
    }
}

/// Current version for [`HistoryIdCursor`].
pub const HISTORY_ID_CURSOR_VERSION: u32 = 1;

/// Cursor shape for providers exposing a single global change log via an
/// opaque history id (mailboxes).
#[derive(Debug, Clone, Default, PartialEq, Serialize, serde::Deserialize)]
pub struct HistoryIdCursor {
    /// Cursor wrapper version.
    pub version: u32,
    /// Provider history id to resume from.
    #[serde(default)]
    pub history_id: Option<String>,
}

impl HistoryIdCursor {
    /// Encodes this cursor as URL-safe base64 JSON.
    #[must_use]
    pub fn encode(&self) -> String {
        encode(self)
    }

    /// Decodes a cursor previously produced by [`HistoryIdCursor::encode`].
    pub fn decode(encoded: &str) -> Result<Self, CursorError> {
        decode(encoded, HISTORY_ID_CURSOR_VERSION, |c: &HistoryIdCursor| {
            c.version
        })
    }
}
