//! SQLite implementation of `ExclusionStore`

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

use sercha_core::domain::Exclusion;
use sercha_core::domain::newtypes::{DocumentId, ExclusionId, SourceId, Uri};
use sercha_core::ports::{ExclusionStore, StoreError};

use crate::util::{backend, decode_id};

/// SQLite-backed `ExclusionStore`.
pub struct SqliteExclusionStore {
    pool: SqlitePool,
}

impl SqliteExclusionStore {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_exclusion(row: &SqliteRow) -> Result<Exclusion, StoreError> {
    let id: String = row.get("id");
    let source_id: String = row.get("source_id");
    let document_id: Option<String> = row.get("document_id");
    let uri: String = row.get("uri");

    Ok(Exclusion {
        id: decode_id("exclusion.id", id, ExclusionId::new)?,
        source_id: decode_id("exclusion.source_id", source_id, SourceId::new)?,
        document_id: document_id
            .map(|v| decode_id("exclusion.document_id", v, DocumentId::new))
            .transpose()?,
        uri: Uri::new(uri).map_err(|e| StoreError::Decode(format!("exclusion.uri: {e}")))?,
        reason: row.get("reason"),
        excluded_at: row.get::<DateTime<Utc>, _>("excluded_at"),
    })
}

#[async_trait]
impl ExclusionStore for SqliteExclusionStore {
    async fn add(&self, exclusion: &Exclusion) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO exclusions (id, source_id, document_id, uri, reason, excluded_at) \
             VALUES (?, ?, ?, ?, ?, ?) \
             ON CONFLICT(source_id, uri) DO UPDATE SET reason = excluded.reason, excluded_at = excluded.excluded_at",
        )
        .bind(exclusion.id.as_str())
        .bind(exclusion.source_id.as_str())
        .bind(exclusion.document_id.as_ref().map(DocumentId::as_str))
        .bind(exclusion.uri.as_str())
        .bind(&exclusion.reason)
        .bind(exclusion.excluded_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn remove(&self, id: &ExclusionId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM exclusions WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn get_by_source_id(&self, source_id: &SourceId) -> Result<Vec<Exclusion>, StoreError> {
        let rows = sqlx::query("SELECT * FROM exclusions WHERE source_id = ?")
            .bind(source_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.iter().map(row_to_exclusion).collect()
    }

    async fn is_excluded(&self, source_id: &SourceId, uri: &Uri) -> Result<bool, StoreError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM exclusions WHERE source_id = ? AND uri = ?",
        )
        .bind(source_id.as_str())
        .bind(uri.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;
        Ok(count > 0)
    }

    async fn list(&self) -> Result<Vec<Exclusion>, StoreError> {
        let rows = sqlx::query("SELECT * FROM exclusions ORDER BY excluded_at ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.iter().map(row_to_exclusion).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DatabasePool;
    use crate::sources::SqliteSourceStore;
    use sercha_core::domain::Source;
    use sercha_core::ports::SourceStore;

    async fn stores() -> (SqliteExclusionStore, SourceId) {
        let pool = DatabasePool::open_in_memory().await.unwrap();
        let sources = SqliteSourceStore::new(pool.pool().clone());
        let source = Source::new(SourceId::generate(), "github", "a");
        sources.save(&source).await.unwrap();
        (SqliteExclusionStore::new(pool.pool().clone()), source.id)
    }

    #[tokio::test]
    async fn is_excluded_reflects_added_entries() {
        let (store, source_id) = stores().await;
        let uri = Uri::new("gh://a/b/issues/1").unwrap();
        assert!(!store.is_excluded(&source_id, &uri).await.unwrap());

        let exclusion = Exclusion::new(ExclusionId::generate(), source_id.clone(), uri.clone(), "noisy");
        store.add(&exclusion).await.unwrap();

        assert!(store.is_excluded(&source_id, &uri).await.unwrap());
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let (store, _source_id) = stores().await;
        let id = ExclusionId::generate();
        store.remove(&id).await.unwrap();
        store.remove(&id).await.unwrap();
    }

    #[tokio::test]
    async fn get_by_source_id_scopes_results() {
        let (store, source_id) = stores().await;
        store
            .add(&Exclusion::new(
                ExclusionId::generate(),
                source_id.clone(),
                Uri::new("gh://a/b/issues/1").unwrap(),
                "noisy",
            ))
            .await
            .unwrap();
        store
            .add(&Exclusion::new(
                ExclusionId::generate(),
                SourceId::generate(),
                Uri::new("gh://x/y/issues/1").unwrap(),
                "other source",
            ))
            .await
            .unwrap();

        let mine = store.get_by_source_id(&source_id).await.unwrap();
        assert_eq!(mine.len(), 1);
    }
}
