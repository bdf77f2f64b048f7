//! SQLite implementation of `SourceStore`

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

use sercha_core::domain::Source;
use sercha_core::domain::newtypes::{AuthProviderId, CredentialsId, SourceId};
use sercha_core::ports::{SourceStore, StoreError};

use crate::util::{backend, decode_id, from_json, to_json};

/// SQLite-backed `SourceStore`.
pub struct SqliteSourceStore {
    pool: SqlitePool,
}

impl SqliteSourceStore {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn row_to_source(row: &SqliteRow) -> Result<Source, StoreError> {
    let id: String = row.get("id");
    let auth_provider_id: Option<String> = row.get("auth_provider_id");
    let credentials_id: Option<String> = row.get("credentials_id");
    let configuration: String = row.get("configuration");

    Ok(Source {
        id: decode_id("source.id", id, SourceId::new)?,
        source_type: row.get("source_type"),
        name: row.get("name"),
        configuration: from_json("source.configuration", &configuration)?,
        auth_provider_id: auth_provider_id
            .map(|v| decode_id("source.auth_provider_id", v, AuthProviderId::new))
            .transpose()?,
        credentials_id: credentials_id
            .map(|v| decode_id("source.credentials_id", v, CredentialsId::new))
            .transpose()?,
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
        updated_at: row.get::<DateTime<Utc>, _>("updated_at"),
    })
}

#[async_trait]
impl SourceStore for SqliteSourceStore {
    async fn save(&self, source: &Source) -> Result<(), StoreError> {
        if source.id.as_str().trim().is_empty() {
            return Err(StoreError::InvalidInput("source id must not be empty".into()));
        }

        let existing_created_at: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT created_at FROM sources WHERE id = ?")
                .bind(source.id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(backend)?;

        let created_at = existing_created_at.unwrap_or(source.created_at);
        let updated_at = Utc::now();

        sqlx::query(
            "INSERT INTO sources \
             (id, source_type, name, configuration, auth_provider_id, credentials_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
               source_type = excluded.source_type, \
               name = excluded.name, \
               configuration = excluded.configuration, \
               auth_provider_id = excluded.auth_provider_id, \
               credentials_id = excluded.credentials_id, \
               updated_at = excluded.updated_at",
        )
        .bind(source.id.as_str())
        .bind(&source.source_type)
        .bind(&source.name)
        .bind(to_json(&source.configuration))
        .bind(source.auth_provider_id.as_ref().map(AuthProviderId::as_str))
        .bind(source.credentials_id.as_ref().map(CredentialsId::as_str))
        .bind(created_at)
        .bind(updated_at)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        tracing::trace!(source_id = %source.id, "saved source");
        Ok(())
    }

    async fn get(&self, id: &SourceId) -> Result<Source, StoreError> {
        let row = sqlx::query("SELECT * FROM sources WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

        match row {
            Some(row) => row_to_source(&row),
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete(&self, id: &SourceId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM sources WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Source>, StoreError> {
        let rows = sqlx::query("SELECT * FROM sources ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.iter().map(row_to_source).collect()
    }
}
