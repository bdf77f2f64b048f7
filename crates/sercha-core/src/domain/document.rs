//! Document and Chunk domain entities
//!
//! A `Document` is the unit the sync engine upserts; a `Chunk` is a
//! retrieval-sized slice of a document paired with a vector embedding.
//! Chunks are rewritten wholesale, in one transaction, per document.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::{ChunkId, DocumentId, SourceId, Uri};

/// A document ingested from a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Stable identifier; upserts are keyed on this.
    pub id: DocumentId,
    /// Owning source.
    pub source_id: SourceId,
    /// Stable natural key within the source (not necessarily a URL).
    pub uri: Uri,
    /// Display title.
    pub title: String,
    /// Raw content bytes.
    pub content: Vec<u8>,
    /// MIME type of `content`, when known (e.g. a provider-specific
    /// structured-payload type for issues/pull requests).
    pub mime_type: Option<String>,
    /// Parent document, if this document is hierarchical (e.g. a mail
    /// message's thread, a calendar event's recurring series).
    pub parent_document_id: Option<DocumentId>,
    /// Free-form provider metadata.
    pub metadata: HashMap<String, String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Builds a new document with `created_at`/`updated_at` set to `now`.
    #[must_use]
    pub fn new(id: DocumentId, source_id: SourceId, uri: Uri, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            source_id,
            uri,
            title: title.into(),
            content: Vec::new(),
            mime_type: None,
            parent_document_id: None,
            metadata: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A sub-document unit paired with a vector embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable identifier.
    pub id: ChunkId,
    /// Owning document.
    pub document_id: DocumentId,
    /// Zero-based position within the document; unique per document.
    pub position: u32,
    /// Chunk text content.
    pub content: String,
    /// Vector embedding; length must be uniform within a document.
    pub embedding: Vec<f32>,
    /// Free-form metadata.
    pub metadata: HashMap<String, String>,
}

impl Chunk {
    /// Builds a new chunk at the given position.
    pub fn new(
        id: ChunkId,
        document_id: DocumentId,
        position: u32,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id,
            document_id,
            position,
            content: content.into(),
            embedding: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Validates that a set of chunks for one document has strictly
    /// increasing, unique positions and uniform embedding length.
    pub fn validate_set(chunks: &[Chunk]) -> Result<(), DomainError> {
        let mut seen = std::collections::HashSet::new();
        let mut embedding_len = None;
        for chunk in chunks {
            if !seen.insert(chunk.position) {
                return Err(DomainError::InvalidPosition(format!(
                    "duplicate position {} for document {}",
                    chunk.position, chunk.document_id
                )));
            }
            if !chunk.embedding.is_empty() {
                match embedding_len {
                    None => embedding_len = Some(chunk.embedding.len()),
                    Some(len) if len != chunk.embedding.len() => {
                        return Err(DomainError::ValidationFailed(format!(
                            "embedding length mismatch within document {}",
                            chunk.document_id
                        )));
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_id() -> DocumentId {
        DocumentId::new("doc-1").unwrap()
    }

    #[test]
    fn validate_set_rejects_duplicate_positions() {
        let chunks = vec![
            Chunk::new(ChunkId::new("c1").unwrap(), doc_id(), 0, "a"),
            Chunk::new(ChunkId::new("c2").unwrap(), doc_id(), 0, "b"),
        ];
        assert!(Chunk::validate_set(&chunks).is_err());
    }

    #[test]
    fn validate_set_rejects_mismatched_embedding_lengths() {
        let mut a = Chunk::new(ChunkId::new("c1").unwrap(), doc_id(), 0, "a");
        a.embedding = vec![0.0, 1.0];
        let mut b = Chunk::new(ChunkId::new("c2").unwrap(), doc_id(), 1, "b");
        b.embedding = vec![0.0];
        assert!(Chunk::validate_set(&[a, b]).is_err());
    }

    #[test]
    fn validate_set_accepts_ascending_positions() {
        let chunks = vec![
            Chunk::new(ChunkId::new("c1").unwrap(), doc_id(), 0, "a"),
            Chunk::new(ChunkId::new("c2").unwrap(), doc_id(), 1, "b"),
        ];
        assert!(Chunk::validate_set(&chunks).is_ok());
    }
}
