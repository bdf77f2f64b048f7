//! Sync engine
//!
//! Drives a single [`Connector`] end-to-end for one source: decides
//! between a full and an incremental sync from the stored [`SyncState`],
//! drains the connector's document and terminal channels, filters
//! survivors against the [`ExclusionStore`], and upserts or deletes
//! through the [`DocumentStore`]. The new cursor is only persisted once
//! the terminal channel reports [`SyncOutcome::Complete`].

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use sercha_core::connector::{
    ChangeKind, Connector, ConnectorError, RawDocument, RawDocumentChange, SyncOutcome,
};
use sercha_core::domain::newtypes::{DocumentId, SourceId, Uri};
use sercha_core::domain::{Document, SyncState};
use sercha_core::ports::{DocumentStore, ExclusionStore, StoreError, SyncStateStore};

/// Errors surfaced by a sync run.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Cancellation fired mid-run; no cursor was committed.
    #[error("sync cancelled")]
    Cancelled,
    /// The connector's terminal channel closed without ever sending a
    /// value, which the contract forbids.
    #[error("terminal channel closed without a result")]
    TerminalClosed,
    /// A document or change carried an invalid URI.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// A metadata store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The connector itself reported a failure.
    #[error(transparent)]
    Connector(#[from] ConnectorError),
}

/// Summary of one completed sync run.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncSummary {
    /// Documents created or updated in this run.
    pub documents_upserted: u64,
    /// Documents deleted in this run (incremental syncs only).
    pub documents_deleted: u64,
    /// Documents skipped because they matched an exclusion.
    pub documents_excluded: u64,
    /// Wall-clock duration of the run.
    pub duration_ms: u64,
}

#[derive(Default)]
struct Tally {
    upserted: u64,
    deleted: u64,
    excluded: u64,
}

enum ItemOutcome {
    Upserted,
    Deleted,
    Excluded,
}

impl Tally {
    fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Upserted => self.upserted += 1,
            ItemOutcome::Deleted => self.deleted += 1,
            ItemOutcome::Excluded => self.excluded += 1,
        }
    }
}

/// Deterministic document id derived from `(source_id, uri)`, so that
/// re-syncing the same item always upserts the same row instead of
/// minting a fresh one every run.
fn derive_document_id(source_id: &SourceId, uri: &str) -> DocumentId {
    let name = format!("{}\u{0}{}", source_id.as_str(), uri);
    let id = Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes());
    DocumentId::new(id.to_string()).expect("uuid string is never empty")
}

/// True for the two connector errors the engine recovers from by
/// promoting the current run to a full sync rather than surfacing a
/// failure: the provider reported the stored cursor itself as invalid.
fn is_cursor_expired(error: &ConnectorError) -> bool {
    matches!(error, ConnectorError::SyncTokenExpired | ConnectorError::HistoryIdExpired)
}

/// Drains `documents` and `terminal` together, always preferring a ready
/// document over a ready terminal value so no record is lost ahead of
/// the sentinel. Once `documents` closes, only `terminal` and
/// cancellation are polled.
async fn drain_loop<T, F, Fut>(
    mut documents: mpsc::Receiver<T>,
    mut terminal: mpsc::Receiver<SyncOutcome>,
    cancellation: &CancellationToken,
    mut on_item: F,
) -> Result<(SyncOutcome, Tally), EngineError>
where
    F: FnMut(T) -> Fut,
    Fut: Future<Output = Result<ItemOutcome, EngineError>>,
{
    let mut tally = Tally::default();
    let mut documents_open = true;

    loop {
        if documents_open {
            tokio::select! {
                biased;
                () = cancellation.cancelled() => return Err(EngineError::Cancelled),
                maybe_item = documents.recv() => {
                    match maybe_item {
                        Some(item) => {
                            let outcome = on_item(item).await?;
                            tally.record(outcome);
                            continue;
                        }
                        None => {
                            documents_open = false;
                            continue;
                        }
                    }
                }
                maybe_outcome = terminal.recv() => {
                    return maybe_outcome
                        .map(|outcome| (outcome, tally))
                        .ok_or(EngineError::TerminalClosed);
                }
            }
        } else {
            tokio::select! {
                () = cancellation.cancelled() => return Err(EngineError::Cancelled),
                maybe_outcome = terminal.recv() => {
                    return maybe_outcome
                        .map(|outcome| (outcome, tally))
                        .ok_or(EngineError::TerminalClosed);
                }
            }
        }
    }
}

/// Drives a [`Connector`] end-to-end against the metadata store.
pub struct SyncEngine {
    document_store: Arc<dyn DocumentStore>,
    sync_state_store: Arc<dyn SyncStateStore>,
    exclusion_store: Arc<dyn ExclusionStore>,
}

impl SyncEngine {
    /// Builds a new engine over the given store ports.
    #[must_use]
    pub fn new(
        document_store: Arc<dyn DocumentStore>,
        sync_state_store: Arc<dyn SyncStateStore>,
        exclusion_store: Arc<dyn ExclusionStore>,
    ) -> Self {
        Self {
            document_store,
            sync_state_store,
            exclusion_store,
        }
    }

    /// Runs one sync for `source_id` against `connector`.
    ///
    /// Loads the stored [`SyncState`]; a missing state takes the full
    /// sync path, any other store error is fatal. Cancellation aborts
    /// the run without committing a new cursor.
    #[tracing::instrument(skip(self, connector, cancellation))]
    pub async fn run(
        &self,
        connector: &(dyn Connector + '_),
        source_id: &SourceId,
        cancellation: CancellationToken,
    ) -> Result<SyncSummary, EngineError> {
        let start = Instant::now();

        let prior = self.sync_state_store.get(source_id).await;
        let (outcome, tally) = match prior {
            Ok(state) => {
                let result = match self.run_incremental(connector, source_id, state, &cancellation).await {
                    Ok(result) => Some(result),
                    Err(EngineError::Connector(e)) if is_cursor_expired(&e) => None,
                    Err(e) => return Err(e),
                };
                match result {
                    Some((SyncOutcome::Failed(e), _)) if is_cursor_expired(&e) => {
                        tracing::info!(source_id = %source_id, error = %e, "stored cursor no longer valid, falling back to full sync");
                        self.run_full(connector, source_id, &cancellation).await?
                    }
                    Some(result) => result,
                    None => {
                        tracing::info!(source_id = %source_id, "stored cursor no longer valid, falling back to full sync");
                        self.run_full(connector, source_id, &cancellation).await?
                    }
                }
            }
            Err(e) if e.is_not_found() => {
                self.run_full(connector, source_id, &cancellation).await?
            }
            Err(e) => return Err(EngineError::Store(e)),
        };

        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        match outcome {
            SyncOutcome::Complete { cursor } => {
                let state = SyncState::new(source_id.clone(), cursor);
                self.sync_state_store.save(&state).await?;
                let summary = SyncSummary {
                    documents_upserted: tally.upserted,
                    documents_deleted: tally.deleted,
                    documents_excluded: tally.excluded,
                    duration_ms,
                };
                tracing::info!(
                    source_id = %source_id,
                    documents_upserted = summary.documents_upserted,
                    documents_deleted = summary.documents_deleted,
                    documents_excluded = summary.documents_excluded,
                    duration_ms = summary.duration_ms,
                    "sync completed"
                );
                Ok(summary)
            }
            SyncOutcome::Failed(err) => {
                tracing::warn!(source_id = %source_id, error = %err, "sync reported failure; cursor not advanced");
                Err(EngineError::Connector(err))
            }
        }
    }

    async fn run_full(
        &self,
        connector: &(dyn Connector + '_),
        source_id: &SourceId,
        cancellation: &CancellationToken,
    ) -> Result<(SyncOutcome, Tally), EngineError> {
        let streams = connector.full_sync(cancellation.clone()).await?;
        drain_loop(
            streams.documents,
            streams.terminal,
            cancellation,
            |raw| self.upsert_or_exclude(source_id, raw),
        )
        .await
    }

    async fn run_incremental(
        &self,
        connector: &(dyn Connector + '_),
        source_id: &SourceId,
        prior: SyncState,
        cancellation: &CancellationToken,
    ) -> Result<(SyncOutcome, Tally), EngineError> {
        let streams = connector
            .incremental_sync(cancellation.clone(), prior)
            .await?;
        drain_loop(
            streams.documents,
            streams.terminal,
            cancellation,
            |change| self.apply_change(source_id, change),
        )
        .await
    }

    async fn upsert_or_exclude(
        &self,
        source_id: &SourceId,
        raw: RawDocument,
    ) -> Result<ItemOutcome, EngineError> {
        let uri = Uri::new(raw.uri.clone()).map_err(|e| EngineError::InvalidInput(e.to_string()))?;

        if self.exclusion_store.is_excluded(source_id, &uri).await? {
            tracing::debug!(source_id = %source_id, uri = %uri, "document excluded, skipping");
            return Ok(ItemOutcome::Excluded);
        }

        let id = derive_document_id(source_id, uri.as_str());
        let mut document = Document::new(id, source_id.clone(), uri, raw.title);
        document.content = raw.content;
        document.mime_type = (!raw.mime_type.is_empty()).then_some(raw.mime_type);
        document.parent_document_id = raw
            .parent_uri
            .map(|parent_uri| derive_document_id(source_id, &parent_uri));
        document.metadata = raw.metadata;

        self.document_store.save_document(&document).await?;
        Ok(ItemOutcome::Upserted)
    }

    async fn apply_change(
        &self,
        source_id: &SourceId,
        change: RawDocumentChange,
    ) -> Result<ItemOutcome, EngineError> {
        match change.kind {
            ChangeKind::Updated => self.upsert_or_exclude(source_id, change.document).await,
            ChangeKind::Deleted => {
                let uri = Uri::new(change.document.uri.clone())
                    .map_err(|e| EngineError::InvalidInput(e.to_string()))?;
                let id = derive_document_id(source_id, uri.as_str());
                self.document_store.delete_document(&id).await?;
                Ok(ItemOutcome::Deleted)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;

    use sercha_core::connector::{Capabilities, SyncStreams, TokenProvider};

    #[derive(Default)]
    struct FakeDocumentStore {
        documents: StdMutex<HashMap<String, Document>>,
    }

    #[async_trait]
    impl DocumentStore for FakeDocumentStore {
        async fn save_document(&self, document: &Document) -> Result<(), StoreError> {
            self.documents
                .lock()
                .unwrap()
                .insert(document.id.as_str().to_string(), document.clone());
            Ok(())
        }

        async fn save_chunks(
            &self,
            _document_id: &DocumentId,
            _chunks: &[sercha_core::domain::Chunk],
        ) -> Result<(), StoreError> {
            Ok(())
        }

        async fn get_document(&self, id: &DocumentId) -> Result<Document, StoreError> {
            self.documents
                .lock()
                .unwrap()
                .get(id.as_str())
                .cloned()
                .ok_or(StoreError::NotFound)
        }

        async fn get_chunk(
            &self,
            _id: &sercha_core::domain::newtypes::ChunkId,
        ) -> Result<sercha_core::domain::Chunk, StoreError> {
            Err(StoreError::NotFound)
        }

        async fn get_chunks(
            &self,
            _document_id: &DocumentId,
        ) -> Result<Vec<sercha_core::domain::Chunk>, StoreError> {
            Ok(Vec::new())
        }

        async fn delete_document(&self, id: &DocumentId) -> Result<(), StoreError> {
            self.documents.lock().unwrap().remove(id.as_str());
            Ok(())
        }

        async fn list_documents(&self, source_id: &SourceId) -> Result<Vec<Document>, StoreError> {
            Ok(self
                .documents
                .lock()
                .unwrap()
                .values()
                .filter(|d| &d.source_id == source_id)
                .cloned()
                .collect())
        }
    }

    #[derive(Default)]
    struct FakeSyncStateStore {
        states: StdMutex<HashMap<String, SyncState>>,
    }

    #[async_trait]
    impl SyncStateStore for FakeSyncStateStore {
        async fn save(&self, state: &SyncState) -> Result<(), StoreError> {
            self.states
                .lock()
                .unwrap()
                .insert(state.source_id.as_str().to_string(), state.clone());
            Ok(())
        }

        async fn get(&self, source_id: &SourceId) -> Result<SyncState, StoreError> {
            self.states
                .lock()
                .unwrap()
                .get(source_id.as_str())
                .cloned()
                .ok_or(StoreError::NotFound)
        }

        async fn delete(&self, source_id: &SourceId) -> Result<(), StoreError> {
            self.states.lock().unwrap().remove(source_id.as_str());
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeExclusionStore {
        excluded: StdMutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl ExclusionStore for FakeExclusionStore {
        async fn add(
            &self,
            exclusion: &sercha_core::domain::Exclusion,
        ) -> Result<(), StoreError> {
            self.excluded.lock().unwrap().push((
                exclusion.source_id.as_str().to_string(),
                exclusion.uri.as_str().to_string(),
            ));
            Ok(())
        }

        async fn remove(
            &self,
            _id: &sercha_core::domain::newtypes::ExclusionId,
        ) -> Result<(), StoreError> {
            Ok(())
        }

        async fn get_by_source_id(
            &self,
            _source_id: &SourceId,
        ) -> Result<Vec<sercha_core::domain::Exclusion>, StoreError> {
            Ok(Vec::new())
        }

        async fn is_excluded(&self, source_id: &SourceId, uri: &Uri) -> Result<bool, StoreError> {
            Ok(self
                .excluded
                .lock()
                .unwrap()
                .iter()
                .any(|(s, u)| s == source_id.as_str() && u == uri.as_str()))
        }

        async fn list(&self) -> Result<Vec<sercha_core::domain::Exclusion>, StoreError> {
            Ok(Vec::new())
        }
    }

    struct FakeConnector {
        source_id: String,
        full_documents: StdMutex<Option<Vec<RawDocument>>>,
        full_outcome: StdMutex<Option<SyncOutcome>>,
        incremental_changes: StdMutex<Option<Vec<RawDocumentChange>>>,
        incremental_outcome: StdMutex<Option<SyncOutcome>>,
    }

    impl FakeConnector {
        fn with_full(source_id: &str, documents: Vec<RawDocument>, outcome: SyncOutcome) -> Self {
            Self {
                source_id: source_id.to_string(),
                full_documents: StdMutex::new(Some(documents)),
                full_outcome: StdMutex::new(Some(outcome)),
                incremental_changes: StdMutex::new(None),
                incremental_outcome: StdMutex::new(None),
            }
        }

        fn with_incremental(
            source_id: &str,
            changes: Vec<RawDocumentChange>,
            outcome: SyncOutcome,
        ) -> Self {
            Self {
                source_id: source_id.to_string(),
                full_documents: StdMutex::new(None),
                full_outcome: StdMutex::new(None),
                incremental_changes: StdMutex::new(Some(changes)),
                incremental_outcome: StdMutex::new(Some(outcome)),
            }
        }

        /// An incremental attempt that reports `incremental_outcome` over
        /// its terminal channel, with a full-sync fallback ready behind it.
        fn with_incremental_falling_back_to_full(
            source_id: &str,
            incremental_outcome: SyncOutcome,
            full_documents: Vec<RawDocument>,
            full_outcome: SyncOutcome,
        ) -> Self {
            Self {
                source_id: source_id.to_string(),
                full_documents: StdMutex::new(Some(full_documents)),
                full_outcome: StdMutex::new(Some(full_outcome)),
                incremental_changes: StdMutex::new(Some(Vec::new())),
                incremental_outcome: StdMutex::new(Some(incremental_outcome)),
            }
        }
    }

    #[async_trait]
    impl TokenProvider for FakeConnector {
        async fn get_token(&self, _ctx: CancellationToken) -> Result<String, ConnectorError> {
            Ok("token".into())
        }
    }

    #[async_trait]
    impl Connector for FakeConnector {
        fn connector_type(&self) -> &str {
            "fake"
        }

        fn source_id(&self) -> &str {
            &self.source_id
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities::default()
        }

        async fn validate(&self, _ctx: CancellationToken) -> Result<(), ConnectorError> {
            Ok(())
        }

        async fn full_sync(
            &self,
            _ctx: CancellationToken,
        ) -> Result<SyncStreams<RawDocument>, ConnectorError> {
            let documents = self.full_documents.lock().unwrap().take().unwrap_or_default();
            let outcome = self
                .full_outcome
                .lock()
                .unwrap()
                .take()
                .expect("full_sync outcome configured");

            let (doc_tx, doc_rx) = mpsc::channel(16);
            let (term_tx, term_rx) = mpsc::channel(1);
            tokio::spawn(async move {
                for doc in documents {
                    if doc_tx.send(doc).await.is_err() {
                        return;
                    }
                }
                let _ = term_tx.send(outcome).await;
            });
            Ok(SyncStreams::new(doc_rx, term_rx))
        }

        async fn incremental_sync(
            &self,
            _ctx: CancellationToken,
            _prior: SyncState,
        ) -> Result<SyncStreams<RawDocumentChange>, ConnectorError> {
            let changes = self
                .incremental_changes
                .lock()
                .unwrap()
                .take()
                .unwrap_or_default();
            let outcome = self
                .incremental_outcome
                .lock()
                .unwrap()
                .take()
                .expect("incremental_sync outcome configured");

            let (doc_tx, doc_rx) = mpsc::channel(16);
            let (term_tx, term_rx) = mpsc::channel(1);
            tokio::spawn(async move {
                for change in changes {
                    if doc_tx.send(change).await.is_err() {
                        return;
                    }
                }
                let _ = term_tx.send(outcome).await;
            });
            Ok(SyncStreams::new(doc_rx, term_rx))
        }

        async fn get_account_identifier(&self, _access_token: &str) -> Result<String, ConnectorError> {
            Ok("me".into())
        }

        async fn close(&self) -> Result<(), ConnectorError> {
            Ok(())
        }
    }

    fn raw_document(uri: &str) -> RawDocument {
        RawDocument {
            source_id: String::new(),
            uri: uri.to_string(),
            mime_type: "text/plain".to_string(),
            content: b"hello".to_vec(),
            parent_uri: None,
            metadata: HashMap::new(),
            title: "a title".to_string(),
        }
    }

    fn engine() -> (SyncEngine, Arc<FakeDocumentStore>, Arc<FakeSyncStateStore>, Arc<FakeExclusionStore>) {
        let documents = Arc::new(FakeDocumentStore::default());
        let sync_state = Arc::new(FakeSyncStateStore::default());
        let exclusions = Arc::new(FakeExclusionStore::default());
        let engine = SyncEngine::new(documents.clone(), sync_state.clone(), exclusions.clone());
        (engine, documents, sync_state, exclusions)
    }

    #[tokio::test]
    async fn full_sync_upserts_documents_and_persists_cursor() {
        let (engine, documents, sync_state, _exclusions) = engine();
        let source_id = SourceId::generate();
        let connector = FakeConnector::with_full(
            source_id.as_str(),
            vec![raw_document("gh://a/b/blob/main/x.rs")],
            SyncOutcome::Complete {
                cursor: "new-cursor".into(),
            },
        );

        let summary = engine
            .run(&connector, &source_id, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.documents_upserted, 1);
        assert_eq!(summary.documents_excluded, 0);
        let state = sync_state.get(&source_id).await.unwrap();
        assert_eq!(state.cursor, "new-cursor");
        assert_eq!(documents.documents.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_sync_state_takes_the_full_sync_path() {
        let (engine, _documents, sync_state, _exclusions) = engine();
        let source_id = SourceId::generate();
        assert!(sync_state.get(&source_id).await.is_err());

        let connector = FakeConnector::with_full(
            source_id.as_str(),
            vec![],
            SyncOutcome::Complete {
                cursor: "c1".into(),
            },
        );
        engine
            .run(&connector, &source_id, CancellationToken::new())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn prior_sync_state_takes_the_incremental_path_and_honors_deletes() {
        let (engine, documents, sync_state, _exclusions) = engine();
        let source_id = SourceId::generate();
        sync_state
            .save(&SyncState::new(source_id.clone(), "old-cursor"))
            .await
            .unwrap();

        let uri = "gh://a/b/issues/1";
        let create = RawDocumentChange {
            kind: ChangeKind::Updated,
            document: raw_document(uri),
        };
        let delete = RawDocumentChange {
            kind: ChangeKind::Deleted,
            document: raw_document(uri),
        };
        let connector = FakeConnector::with_incremental(
            source_id.as_str(),
            vec![create, delete],
            SyncOutcome::Complete {
                cursor: "new-cursor".into(),
            },
        );

        let summary = engine
            .run(&connector, &source_id, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.documents_upserted, 1);
        assert_eq!(summary.documents_deleted, 1);
        assert!(documents.documents.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn expired_cursor_falls_back_to_full_sync() {
        let (engine, documents, sync_state, _exclusions) = engine();
        let source_id = SourceId::generate();
        sync_state
            .save(&SyncState::new(source_id.clone(), "stale-cursor"))
            .await
            .unwrap();

        let connector = FakeConnector::with_incremental_falling_back_to_full(
            source_id.as_str(),
            SyncOutcome::Failed(ConnectorError::SyncTokenExpired),
            vec![raw_document("gh://a/b/blob/main/x.rs")],
            SyncOutcome::Complete {
                cursor: "fresh-cursor".into(),
            },
        );

        let summary = engine
            .run(&connector, &source_id, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.documents_upserted, 1);
        assert_eq!(documents.documents.lock().unwrap().len(), 1);
        assert_eq!(sync_state.get(&source_id).await.unwrap().cursor, "fresh-cursor");
    }

    #[tokio::test]
    async fn excluded_documents_are_skipped_not_upserted() {
        let (engine, documents, _sync_state, exclusions) = engine();
        let source_id = SourceId::generate();
        let uri = Uri::new("gh://a/b/blob/main/secret.env").unwrap();
        exclusions
            .add(&sercha_core::domain::Exclusion::new(
                sercha_core::domain::newtypes::ExclusionId::generate(),
                source_id.clone(),
                uri.clone(),
                "secret file",
            ))
            .await
            .unwrap();

        let connector = FakeConnector::with_full(
            source_id.as_str(),
            vec![raw_document(uri.as_str())],
            SyncOutcome::Complete {
                cursor: "c1".into(),
            },
        );

        let summary = engine
            .run(&connector, &source_id, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.documents_upserted, 0);
        assert_eq!(summary.documents_excluded, 1);
        assert!(documents.documents.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_outcome_does_not_advance_cursor() {
        let (engine, _documents, sync_state, _exclusions) = engine();
        let source_id = SourceId::generate();
        let connector = FakeConnector::with_full(
            source_id.as_str(),
            vec![],
            SyncOutcome::Failed(ConnectorError::Transport {
                operation: "list_repos".into(),
                source: anyhow::anyhow!("boom"),
            }),
        );

        let err = engine
            .run(&connector, &source_id, CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Connector(_)));
        assert!(sync_state.get(&source_id).await.is_err());
    }

    #[tokio::test]
    async fn cancellation_aborts_without_committing_a_cursor() {
        let (engine, _documents, sync_state, _exclusions) = engine();
        let source_id = SourceId::generate();
        let cancellation = CancellationToken::new();
        cancellation.cancel();

        let connector = FakeConnector::with_full(
            source_id.as_str(),
            vec![raw_document("gh://a/b/blob/main/x.rs")],
            SyncOutcome::Complete {
                cursor: "c1".into(),
            },
        );

        let err = engine.run(&connector, &source_id, cancellation).await.unwrap_err();
        assert!(matches!(err, EngineError::Cancelled));
        assert!(sync_state.get(&source_id).await.is_err());
    }

    #[test]
    fn derive_document_id_is_stable_and_uri_scoped() {
        let source_id = SourceId::generate();
        let a = derive_document_id(&source_id, "gh://a/b/issues/1");
        let b = derive_document_id(&source_id, "gh://a/b/issues/1");
        let c = derive_document_id(&source_id, "gh://a/b/issues/2");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
