//! SQLite implementation of `DocumentStore`

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

use sercha_core::domain::newtypes::{ChunkId, DocumentId, SourceId};
use sercha_core::domain::{Chunk, Document};
use sercha_core::embedding::{bytes_to_floats, floats_to_bytes};
use sercha_core::ports::{DocumentStore, StoreError};

use crate::util::{backend, decode_id, from_json, to_json};

/// SQLite-backed `DocumentStore`.
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_document(row: &SqliteRow) -> Result<Document, StoreError> {
    let id: String = row.get("id");
    let source_id: String = row.get("source_id");
    let uri: String = row.get("uri");
    let parent_document_id: Option<String> = row.get("parent_document_id");
    let metadata: String = row.get("metadata");

    Ok(Document {
        id: decode_id("document.id", id, DocumentId::new)?,
        source_id: decode_id("document.source_id", source_id, SourceId::new)?,
        uri: sercha_core::domain::newtypes::Uri::new(uri)
            .map_err(|e| StoreError::Decode(format!("document.uri: {e}")))?,
        title: row.get("title"),
        content: row.get("content"),
        mime_type: row.get("mime_type"),
        parent_document_id: parent_document_id
            .map(|v| decode_id("document.parent_document_id", v, DocumentId::new))
            .transpose()?,
        metadata: from_json("document.metadata", &metadata)?,
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
        updated_at: row.get::<DateTime<Utc>, _>("updated_at"),
    })
}

fn row_to_chunk(row: &SqliteRow) -> Result<Chunk, StoreError> {
    let id: String = row.get("id");
    let document_id: String = row.get("document_id");
    let metadata: String = row.get("metadata");
    let embedding: Option<Vec<u8>> = row.get("embedding");
    let position: i64 = row.get("position");

    let embedding = match embedding {
        Some(bytes) if !bytes.is_empty() => {
            bytes_to_floats(&bytes).map_err(|e| StoreError::Decode(format!("chunk.embedding: {e}")))?
        }
        _ => Vec::new(),
    };

    Ok(Chunk {
        id: decode_id("chunk.id", id, ChunkId::new)?,
        document_id: decode_id("chunk.document_id", document_id, DocumentId::new)?,
        position: u32::try_from(position).map_err(|e| StoreError::Decode(format!("chunk.position: {e}")))?,
        content: row.get("content"),
        embedding,
        metadata: from_json("chunk.metadata", &metadata)?,
    })
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn save_document(&self, document: &Document) -> Result<(), StoreError> {
        if document.id.as_str().trim().is_empty() {
            return Err(StoreError::InvalidInput("document id must not be empty".into()));
        }

        let existing_created_at: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT created_at FROM documents WHERE id = ?")
                .bind(document.id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;
        let created_at = existing_created_at.unwrap_or(document.created_at);

        sqlx::query(
            "INSERT INTO documents \
             (id, source_id, uri, title, content, mime_type, parent_document_id, metadata, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
               source_id = excluded.source_id, \
               uri = excluded.uri, \
               title = excluded.title, \
               content = excluded.content, \
               mime_type = excluded.mime_type, \
               parent_document_id = excluded.parent_document_id, \
               metadata = excluded.metadata, \
               updated_at = excluded.updated_at",
        )
        .bind(document.id.as_str())
        .bind(document.source_id.as_str())
        .bind(document.uri.as_str())
        .bind(&document.title)
        .bind(&document.content)
        .bind(&document.mime_type)
        .bind(document.parent_document_id.as_ref().map(DocumentId::as_str))
        .bind(to_json(&document.metadata))
        .bind(created_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        Ok(())
    }

    async fn save_chunks(&self, document_id: &DocumentId, chunks: &[Chunk]) -> Result<(), StoreError> {
        Chunk::validate_set(chunks).map_err(|e| StoreError::InvalidInput(e.to_string()))?;

        let mut tx = self.pool.begin().await.map_err(backend)?;

        for chunk in chunks {
            let embedding_bytes = if chunk.embedding.is_empty() {
                None
            } else {
                Some(floats_to_bytes(&chunk.embedding))
            };

            sqlx::query(
                "INSERT INTO chunks (id, document_id, position, content, embedding, metadata) \
                 VALUES (?, ?, ?, ?, ?, ?) \
                 ON CONFLICT(document_id, position) DO UPDATE SET \
                   id = excluded.id, content = excluded.content, embedding = excluded.embedding, metadata = excluded.metadata",
            )
            .bind(chunk.id.as_str())
            .bind(document_id.as_str())
            .bind(i64::from(chunk.position))
            .bind(&chunk.content)
            .bind(embedding_bytes)
            .bind(to_json(&chunk.metadata))
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        }

        let kept_positions: Vec<i64> = chunks.iter().map(|c| i64::from(c.position)).collect();
        if kept_positions.is_empty() {
            sqlx::query("DELETE FROM chunks WHERE document_id = ?")
                .bind(document_id.as_str())
                .execute(&mut *tx)
                .await
                .map_err(backend)?;
        } else {
            let placeholders = kept_positions.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
            let sql = format!(
                "DELETE FROM chunks WHERE document_id = ? AND position NOT IN ({placeholders})"
            );
            let mut query = sqlx::query(&sql).bind(document_id.as_str());
            for position in &kept_positions {
                query = query.bind(position);
            }
            query.execute(&mut *tx).await.map_err(backend)?;
        }

        tx.commit().await.map_err(backend)?;
        Ok(())
    }

    async fn get_document(&self, id: &DocumentId) -> Result<Document, StoreError> {
        let row = sqlx::query("SELECT * FROM documents WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        match row {
            Some(row) => row_to_document(&row),
            None => Err(StoreError::NotFound),
        }
    }

    async fn get_chunk(&self, id: &ChunkId) -> Result<Chunk, StoreError> {
        let row = sqlx::query("SELECT * FROM chunks WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        match row {
            Some(row) => row_to_chunk(&row),
            None => Err(StoreError::NotFound),
        }
    }

    async fn get_chunks(&self, document_id: &DocumentId) -> Result<Vec<Chunk>, StoreError> {
        let rows = sqlx::query("SELECT * FROM chunks WHERE document_id = ? ORDER BY position ASC")
            .bind(document_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.iter().map(row_to_chunk).collect()
    }

    async fn delete_document(&self, id: &DocumentId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn list_documents(&self, source_id: &SourceId) -> Result<Vec<Document>, StoreError> {
        let rows = sqlx::query("SELECT * FROM documents WHERE source_id = ? ORDER BY created_at ASC")
            .bind(source_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.iter().map(row_to_document).collect()
    }
}
