//! The connector contract
//!
//! Every provider adapter (code-host, mail, drive, calendar) implements
//! [`Connector`], the polymorphic interface the sync engine drives. The
//! adapter registry (in `sercha-connectors`) is a plain mapping from type
//! tag to constructor; dispatch here is a trait object, not an enum match,
//! so new providers never require engine changes.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::domain::SyncState;

/// Errors surfaced by connector operations.
///
/// Kinds that the sync engine treats as fatal (`AuthRequired`,
/// `AuthInvalid`, `Cancelled`) stop a run without advancing the cursor.
/// `RateLimited` is expected to be fully absorbed by the rate limiter and
/// should not normally reach the engine. `SyncTokenExpired` /
/// `HistoryIdExpired` are recovered by the engine promoting that
/// container's sync to a full sync for the current run.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The requested record does not exist.
    #[error("not found")]
    NotFound,
    /// A required identity field was missing or empty.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The stored cursor was malformed or of an unknown future version.
    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
    /// An operation was attempted on a connector after `close()`.
    #[error("connector closed")]
    ConnectorClosed,
    /// Authentication is required but no credentials are configured.
    #[error("authentication required")]
    AuthRequired,
    /// The configured credentials were rejected by the provider.
    #[error("authentication invalid: {0}")]
    AuthInvalid(String),
    /// The provider rejected the call as over the rate limit.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds to wait before retrying, if known.
        retry_after_secs: u64,
    },
    /// The container's sync token is no longer valid; re-run as a full
    /// sync for this container.
    #[error("sync token expired")]
    SyncTokenExpired,
    /// The container's history id is no longer valid; re-run as a full
    /// sync for this container.
    #[error("history id expired")]
    HistoryIdExpired,
    /// The provider reported the item as forbidden (HTTP 403); treated
    /// the same as `NotFound` by the engine (skip, leave cursor alone),
    /// but classified separately for operator-visible logging.
    #[error("forbidden: {0}")]
    Forbidden(String),
    /// The calling context was cancelled mid-operation.
    #[error("cancelled")]
    Cancelled,
    /// The operation is not implemented by this connector (e.g. `watch`
    /// on every shipped adapter).
    #[error("not implemented")]
    NotImplemented,
    /// A network/transport-layer failure, with the operation that failed.
    #[error("transport error during {operation}: {source}")]
    Transport {
        /// The operation that failed (for log/error context).
        operation: String,
        /// The underlying cause.
        source: anyhow::Error,
    },
    /// A response could not be decoded into the expected shape.
    #[error("decode error during {operation}: {source}")]
    Decode {
        /// The operation that failed (for log/error context).
        operation: String,
        /// The underlying cause.
        source: anyhow::Error,
    },
}

impl ConnectorError {
    /// Wraps a transport-layer cause with an operation name.
    pub fn transport(operation: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Transport {
            operation: operation.into(),
            source: source.into(),
        }
    }

    /// Wraps a decode-layer cause with an operation name.
    pub fn decode(operation: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Decode {
            operation: operation.into(),
            source: source.into(),
        }
    }

    /// True for `NotFound`.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// True for `AuthRequired` or `AuthInvalid`.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::AuthRequired | Self::AuthInvalid(_))
    }

    /// True for `RateLimited`.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// True for `Forbidden`.
    #[must_use]
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden(_))
    }

    /// True for `NotFound` or `Forbidden` — the two kinds a per-container
    /// fetch failure should skip rather than abort the whole sync for.
    #[must_use]
    pub fn is_skippable(&self) -> bool {
        self.is_not_found() || self.is_forbidden()
    }
}

/// Boolean capability flags the sync engine and tests use for dispatch
/// and gating. Not every adapter supports every capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Supports `IncrementalSync` using a stored cursor.
    pub supports_incremental: bool,
    /// Supports push-based `Watch` (no shipped adapter does today).
    pub supports_watch: bool,
    /// Documents can have a parent (threads, recurring series, wikis).
    pub supports_hierarchy: bool,
    /// Can emit binary (non-UTF8) document content.
    pub supports_binary: bool,
    /// Requires authenticated credentials before any call.
    pub requires_auth: bool,
    /// Supports a cheap `Validate` round-trip.
    pub supports_validation: bool,
    /// Emits a cursor at the end of a sync.
    pub supports_cursor_return: bool,
    /// Can resume a partially-completed sync.
    pub supports_partial_sync: bool,
    /// Calls are governed by a rate limiter.
    pub supports_rate_limiting: bool,
    /// Discovery calls are paginated.
    pub supports_pagination: bool,
}

/// A port-level document, as emitted by a connector before the sync
/// engine backfills `source_id`.
///
/// This is a DTO, not a domain entity: the engine maps it onto
/// `sercha_core::domain::Document` after exclusion filtering.
#[derive(Debug, Clone, Default)]
pub struct RawDocument {
    /// Owning source id; empty until the sync engine backfills it.
    pub source_id: String,
    /// Stable natural-key URI within the source.
    pub uri: String,
    /// MIME type of `content`.
    pub mime_type: String,
    /// Raw content bytes.
    pub content: Vec<u8>,
    /// Parent document URI, if hierarchical.
    pub parent_uri: Option<String>,
    /// Free-form provider metadata.
    pub metadata: HashMap<String, String>,
    /// Display title.
    pub title: String,
}

/// Whether a [`RawDocumentChange`] represents an update or a deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// The document was created or modified.
    Updated,
    /// The document was deleted. `RawDocumentChange::document.content`
    /// is empty in this case; only the URI is meaningful.
    Deleted,
}

/// A single item from an incremental sync's change stream.
#[derive(Debug, Clone)]
pub struct RawDocumentChange {
    /// Whether this is an update or a deletion.
    pub kind: ChangeKind,
    /// The affected document (content empty when `kind` is `Deleted`).
    pub document: RawDocument,
}

/// The single value carried on a sync's terminal channel.
///
/// Exactly one value is ever sent: either `Complete` with the new cursor,
/// or `Failed` with the error that stopped the run. The document channel
/// closes before or simultaneously with this value being sent.
#[derive(Debug)]
pub enum SyncOutcome {
    /// The sync completed; `cursor` is the new opaque, encoded cursor.
    Complete {
        /// The new opaque, encoded cursor to persist.
        cursor: String,
    },
    /// The sync failed; the cursor must not be advanced.
    Failed(ConnectorError),
}

/// The (documents, terminal) channel pair a sync produces.
///
/// The terminal channel has capacity 1 and carries exactly one value.
pub struct SyncStreams<T> {
    /// Stream of documents (or document changes for incremental syncs).
    pub documents: mpsc::Receiver<T>,
    /// Single-value terminal signal channel.
    pub terminal: mpsc::Receiver<SyncOutcome>,
}

impl<T> SyncStreams<T> {
    /// Builds a streams pair from already-created channel halves.
    #[must_use]
    pub fn new(documents: mpsc::Receiver<T>, terminal: mpsc::Receiver<SyncOutcome>) -> Self {
        Self {
            documents,
            terminal,
        }
    }
}

/// A small dependency injected into connectors rather than looked up
/// globally. Implementations must cache and refresh internally so that
/// repeated calls are cheap.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns a currently-valid bearer token, refreshing if necessary.
    async fn get_token(&self, ctx: CancellationToken) -> Result<String, ConnectorError>;
}

/// The polymorphic interface every provider adapter satisfies.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Stable provider type tag, e.g. `"github"`, `"gmail"`.
    fn connector_type(&self) -> &str;

    /// The source this connector instance is bound to.
    fn source_id(&self) -> &str;

    /// Capability flags consumed by the sync engine for dispatch and
    /// test gating.
    fn capabilities(&self) -> Capabilities;

    /// Performs a minimum-cost authenticated round-trip. Never mutates
    /// provider state.
    async fn validate(&self, ctx: CancellationToken) -> Result<(), ConnectorError>;

    /// Produces the complete corpus as the connector currently sees it.
    async fn full_sync(
        &self,
        ctx: CancellationToken,
    ) -> Result<SyncStreams<RawDocument>, ConnectorError>;

    /// Produces changes since `prior.cursor`.
    async fn incremental_sync(
        &self,
        ctx: CancellationToken,
        prior: SyncState,
    ) -> Result<SyncStreams<RawDocumentChange>, ConnectorError>;

    /// Push-based change notification. No shipped adapter implements
    /// this; the default returns `NotImplemented`, per the
    /// specification's open question about keeping the method for
    /// future push-capable adapters.
    async fn watch(&self, _ctx: CancellationToken) -> Result<(), ConnectorError> {
        Err(ConnectorError::NotImplemented)
    }

    /// Stateless lookup used during authentication to label credentials.
    async fn get_account_identifier(&self, access_token: &str) -> Result<String, ConnectorError>;

    /// Idempotent release of per-connector resources.
    async fn close(&self) -> Result<(), ConnectorError>;
}
