//! Document store port

use async_trait::async_trait;

use crate::domain::{Chunk, Document};
use crate::domain::newtypes::{ChunkId, DocumentId, SourceId};

use super::error::StoreError;

/// Port for persisting and querying `Document` and `Chunk` records.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Upserts a document by id.
    async fn save_document(&self, document: &Document) -> Result<(), StoreError>;

    /// Replaces all chunks for a document in a single all-or-nothing
    /// transaction: prepares one upsert statement and applies it to
    /// every chunk, then deletes any previously-stored chunk whose
    /// position is no longer present.
    async fn save_chunks(
        &self,
        document_id: &DocumentId,
        chunks: &[Chunk],
    ) -> Result<(), StoreError>;

    /// Retrieves a document by id, or `StoreError::NotFound`.
    async fn get_document(&self, id: &DocumentId) -> Result<Document, StoreError>;

    /// Retrieves a single chunk by id, or `StoreError::NotFound`.
    async fn get_chunk(&self, id: &ChunkId) -> Result<Chunk, StoreError>;

    /// Retrieves all chunks for a document, ordered by position
    /// ascending.
    async fn get_chunks(&self, document_id: &DocumentId) -> Result<Vec<Chunk>, StoreError>;

    /// Deletes a document, cascading to its chunks. Idempotent.
    async fn delete_document(&self, id: &DocumentId) -> Result<(), StoreError>;

    /// Lists all documents owned by a source.
    async fn list_documents(&self, source_id: &SourceId) -> Result<Vec<Document>, StoreError>;
}
