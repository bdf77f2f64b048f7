//! SQLite implementation of `CredentialsStore`

use async_trait::async_trait;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

use sercha_core::domain::Credentials;
use sercha_core::domain::credentials::{CredentialSecret, OAuthTokens};
use sercha_core::domain::newtypes::{CredentialsId, SourceId};
use sercha_core::ports::{CredentialsStore, StoreError};

use crate::util::decode_id;

/// SQLite-backed `CredentialsStore`.
pub struct SqliteCredentialsStore {
    pool: SqlitePool,
}

impl SqliteCredentialsStore {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

/// On-disk representation of the two possible secret shapes, tagged by
/// `secret_kind` so the column stays introspectable without a JSON
/// `"kind"` wrapper duplicated across both variants.
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
enum SecretPayload {
    OAuth(OAuthTokens),
    PersonalAccessToken(String),
}

fn secret_to_columns(secret: &CredentialSecret) -> (&'static str, String) {
    match secret {
        CredentialSecret::OAuth(tokens) => (
            "oauth",
            serde_json::to_string(&SecretPayload::OAuth(tokens.clone()))
                .expect("oauth tokens are always serializable"),
        ),
        CredentialSecret::PersonalAccessToken(token) => (
            "personal_access_token",
            serde_json::to_string(&SecretPayload::PersonalAccessToken(token.clone()))
                .expect("token string is always serializable"),
        ),
    }
}

fn secret_from_columns(kind: &str, raw: &str) -> Result<CredentialSecret, StoreError> {
    match kind {
        "oauth" => {
            let payload: SecretPayload =
                serde_json::from_str(raw).map_err(|e| StoreError::Decode(format!("credentials.secret: {e}")))?;
            match payload {
                SecretPayload::OAuth(tokens) => Ok(CredentialSecret::OAuth(tokens)),
                SecretPayload::PersonalAccessToken(_) => {
                    Err(StoreError::Decode("secret_kind=oauth but payload is a PAT".into()))
                }
            }
        }
        "personal_access_token" => {
            let payload: SecretPayload =
                serde_json::from_str(raw).map_err(|e| StoreError::Decode(format!("credentials.secret: {e}")))?;
            match payload {
                SecretPayload::PersonalAccessToken(token) => Ok(CredentialSecret::PersonalAccessToken(token)),
                SecretPayload::OAuth(_) => {
                    Err(StoreError::Decode("secret_kind=personal_access_token but payload is oauth".into()))
                }
            }
        }
        other => Err(StoreError::Decode(format!("unknown secret_kind: {other}"))),
    }
}

fn row_to_credentials(row: &SqliteRow) -> Result<Credentials, StoreError> {
    let id: String = row.get("id");
    let source_id: String = row.get("source_id");
    let secret_kind: String = row.get("secret_kind");
    let secret: String = row.get("secret");

    Ok(Credentials {
        id: decode_id("credentials.id", id, CredentialsId::new)?,
        source_id: decode_id("credentials.source_id", source_id, SourceId::new)?,
        account_identifier: row.get("account_identifier"),
        secret: secret_from_columns(&secret_kind, &secret)?,
    })
}

#[async_trait]
impl CredentialsStore for SqliteCredentialsStore {
    async fn save(&self, credentials: &Credentials) -> Result<(), StoreError> {
        let (secret_kind, secret) = secret_to_columns(&credentials.secret);

        sqlx::query(
            "INSERT INTO credentials (id, source_id, account_identifier, secret_kind, secret) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
               account_identifier = excluded.account_identifier, \
               secret_kind = excluded.secret_kind, \
               secret = excluded.secret",
        )
        .bind(credentials.id.as_str())
        .bind(credentials.source_id.as_str())
        .bind(&credentials.account_identifier)
        .bind(secret_kind)
        .bind(secret)
        .execute(&self.pool)
        .await
        .map_err(crate::util::backend)?;
        Ok(())
    }

    async fn get(&self, id: &CredentialsId) -> Result<Credentials, StoreError> {
        let row = sqlx::query("SELECT * FROM credentials WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(crate::util::backend)?;
        match row {
            Some(row) => row_to_credentials(&row),
            None => Err(StoreError::NotFound),
        }
    }

    async fn get_by_source_id(&self, source_id: &SourceId) -> Result<Option<Credentials>, StoreError> {
        let row = sqlx::query("SELECT * FROM credentials WHERE source_id = ?")
            .bind(source_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(crate::util::backend)?;
        row.as_ref().map(row_to_credentials).transpose()
    }

    async fn delete(&self, id: &CredentialsId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM credentials WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(crate::util::backend)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DatabasePool;
    use crate::sources::SqliteSourceStore;
    use sercha_core::domain::Source;
    use sercha_core::ports::SourceStore;

    async fn stores() -> (SqliteCredentialsStore, SourceId) {
        let pool = DatabasePool::open_in_memory().await.unwrap();
        let sources = SqliteSourceStore::new(pool.pool().clone());
        let source = Source::new(SourceId::generate(), "github", "a");
        sources.save(&source).await.unwrap();
        (SqliteCredentialsStore::new(pool.pool().clone()), source.id)
    }

    #[tokio::test]
    async fn save_and_get_oauth_round_trips() {
        let (store, source_id) = stores().await;
        let creds = Credentials::new(
            CredentialsId::generate(),
            source_id,
            "me@example.com",
            CredentialSecret::OAuth(OAuthTokens {
                access_token: "at".into(),
                refresh_token: Some("rt".into()),
                expires_at: chrono::Utc::now() + chrono::Duration::hours(1),
            }),
        );
        store.save(&creds).await.unwrap();
        let fetched = store.get(&creds.id).await.unwrap();
        match fetched.secret {
            CredentialSecret::OAuth(tokens) => assert_eq!(tokens.access_token, "at"),
            CredentialSecret::PersonalAccessToken(_) => panic!("expected oauth"),
        }
    }

    #[tokio::test]
    async fn save_and_get_pat_round_trips() {
        let (store, source_id) = stores().await;
        let creds = Credentials::new(
            CredentialsId::generate(),
            source_id,
            "me",
            CredentialSecret::PersonalAccessToken("ghp_abc".into()),
        );
        store.save(&creds).await.unwrap();
        let fetched = store.get(&creds.id).await.unwrap();
        match fetched.secret {
            CredentialSecret::PersonalAccessToken(token) => assert_eq!(token, "ghp_abc"),
            CredentialSecret::OAuth(_) => panic!("expected pat"),
        }
    }

    #[tokio::test]
    async fn get_by_source_id_returns_none_when_absent() {
        let (store, source_id) = stores().await;
        assert!(store.get_by_source_id(&source_id).await.unwrap().is_none());
    }
}
