//! SQLite implementation of `AuthProviderStore`

use async_trait::async_trait;
use sqlx::{Row, SqlitePool, sqlite::SqliteRow};

use sercha_core::domain::AuthProvider;
use sercha_core::domain::auth_provider::AuthMethod;
use sercha_core::domain::newtypes::AuthProviderId;
use sercha_core::ports::{AuthProviderStore, StoreError};

use crate::util::{backend, decode_id};

/// SQLite-backed `AuthProviderStore`.
pub struct SqliteAuthProviderStore {
    pool: SqlitePool,
}

impl SqliteAuthProviderStore {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn auth_method_to_str(method: AuthMethod) -> &'static str {
    match method {
        AuthMethod::OAuth => "oauth",
        AuthMethod::PersonalAccessToken => "personal_access_token",
    }
}

fn auth_method_from_str(s: &str) -> Result<AuthMethod, StoreError> {
    match s {
        "oauth" => Ok(AuthMethod::OAuth),
        "personal_access_token" => Ok(AuthMethod::PersonalAccessToken),
        other => Err(StoreError::Decode(format!("unknown auth method: {other}"))),
    }
}

fn row_to_provider(row: &SqliteRow) -> Result<AuthProvider, StoreError> {
    let id: String = row.get("id");
    let auth_method: String = row.get("auth_method");
    let oauth_config: Option<String> = row.get("oauth_config");

    Ok(AuthProvider {
        id: decode_id("auth_provider.id", id, AuthProviderId::new)?,
        name: row.get("name"),
        provider_type: row.get("provider_type"),
        auth_method: auth_method_from_str(&auth_method)?,
        oauth_config: oauth_config
            .map(|v| serde_json::from_str(&v))
            .transpose()
            .map_err(|e| StoreError::Decode(format!("auth_provider.oauth_config: {e}")))?,
    })
}

#[async_trait]
impl AuthProviderStore for SqliteAuthProviderStore {
    async fn save(&self, provider: &AuthProvider) -> Result<(), StoreError> {
        let oauth_config = provider
            .oauth_config
            .as_ref()
            .map(|v| serde_json::to_string(v).expect("json value is always serializable"));

        sqlx::query(
            "INSERT INTO auth_providers (id, name, provider_type, auth_method, oauth_config) \
             VALUES (?, ?, ?, ?, ?) \
             ON CONFLICT(id) DO UPDATE SET \
               name = excluded.name, \
               provider_type = excluded.provider_type, \
               auth_method = excluded.auth_method, \
               oauth_config = excluded.oauth_config",
        )
        .bind(provider.id.as_str())
        .bind(&provider.name)
        .bind(&provider.provider_type)
        .bind(auth_method_to_str(provider.auth_method))
        .bind(oauth_config)
        .execute(&self.pool)
        .await
        .map_err(backend)?;
        Ok(())
    }

    async fn get(&self, id: &AuthProviderId) -> Result<AuthProvider, StoreError> {
        let row = sqlx::query("SELECT * FROM auth_providers WHERE id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        match row {
            Some(row) => row_to_provider(&row),
            None => Err(StoreError::NotFound),
        }
    }

    async fn delete(&self, id: &AuthProviderId) -> Result<(), StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sources WHERE auth_provider_id = ?")
            .bind(id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(backend)?;

        if count > 0 {
            return Err(StoreError::InUse {
                what: format!("auth provider {id}"),
                count: count as u64,
            });
        }

        sqlx::query("DELETE FROM auth_providers WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<AuthProvider>, StoreError> {
        let rows = sqlx::query("SELECT * FROM auth_providers ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        rows.iter().map(row_to_provider).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DatabasePool;
    use crate::sources::SqliteSourceStore;
    use sercha_core::domain::Source;
    use sercha_core::domain::newtypes::SourceId;
    use sercha_core::ports::SourceStore;

    #[tokio::test]
    async fn save_and_get_round_trips() {
        let pool = DatabasePool::open_in_memory().await.unwrap();
        let store = SqliteAuthProviderStore::new(pool.pool().clone());
        let provider = AuthProvider::new(AuthProviderId::generate(), "github oauth", "github", AuthMethod::OAuth);
        store.save(&provider).await.unwrap();
        let fetched = store.get(&provider.id).await.unwrap();
        assert_eq!(fetched.auth_method, AuthMethod::OAuth);
    }

    #[tokio::test]
    async fn delete_refuses_while_referenced() {
        let pool = DatabasePool::open_in_memory().await.unwrap();
        let providers = SqliteAuthProviderStore::new(pool.pool().clone());
        let sources = SqliteSourceStore::new(pool.pool().clone());

        let provider = AuthProvider::new(AuthProviderId::generate(), "github oauth", "github", AuthMethod::OAuth);
        providers.save(&provider).await.unwrap();

        let mut source = Source::new(SourceId::generate(), "github", "a");
        source.auth_provider_id = Some(provider.id.clone());
        sources.save(&source).await.unwrap();

        let err = providers.delete(&provider.id).await.unwrap_err();
        assert!(err.is_in_use());
    }

    #[tokio::test]
    async fn delete_succeeds_once_unreferenced() {
        let pool = DatabasePool::open_in_memory().await.unwrap();
        let providers = SqliteAuthProviderStore::new(pool.pool().clone());
        let provider = AuthProvider::new(AuthProviderId::generate(), "gmail oauth", "gmail", AuthMethod::OAuth);
        providers.save(&provider).await.unwrap();
        providers.delete(&provider.id).await.unwrap();
        assert!(providers.get(&provider.id).await.unwrap_err().is_not_found());
    }
}
