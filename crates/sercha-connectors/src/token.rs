//! Caching OAuth token provider
//!
//! A small dependency injected into connectors rather than looked up
//! globally. Caches the current access token
//! and refreshes it once it's within a minute of expiry, mirroring the
//! teacher's `Tokens::is_expired`/`expires_within` discipline, then
//! persists the refreshed pair back through the `CredentialsStore` so
//! the next process start-up resumes without a fresh login.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use oauth2::basic::BasicClient;
use oauth2::{ClientId, ClientSecret, RefreshToken, TokenResponse, TokenUrl};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use sercha_core::connector::{ConnectorError, TokenProvider};
use sercha_core::domain::credentials::{CredentialSecret, OAuthTokens};
use sercha_core::domain::newtypes::{CredentialsId, SourceId};
use sercha_core::domain::Credentials;
use sercha_core::ports::CredentialsStore;

/// A refresh is attempted once the access token is within this long of
/// its recorded expiry, rather than waiting for an outright 401.
fn expiry_buffer() -> Duration {
    Duration::seconds(60)
}

/// Caches an OAuth access token in memory and refreshes it from the
/// stored refresh token, persisting the new pair back to the store.
pub struct OAuthTokenProvider {
    credentials_id: CredentialsId,
    source_id: SourceId,
    account_identifier: String,
    credentials_store: Arc<dyn CredentialsStore>,
    client_id: String,
    client_secret: Option<String>,
    token_url: String,
    http: reqwest::Client,
    tokens: Mutex<OAuthTokens>,
}

impl OAuthTokenProvider {
    /// Builds a provider seeded with the credentials record's current
    /// token pair. Returns `AuthRequired` if the credentials hold a
    /// personal access token rather than an OAuth pair.
    pub fn new(
        credentials: Credentials,
        credentials_store: Arc<dyn CredentialsStore>,
        client_id: impl Into<String>,
        client_secret: Option<String>,
        token_url: impl Into<String>,
    ) -> Result<Self, ConnectorError> {
        let tokens = match credentials.secret {
            CredentialSecret::OAuth(tokens) => tokens,
            CredentialSecret::PersonalAccessToken(_) => return Err(ConnectorError::AuthRequired),
        };

        Ok(Self {
            credentials_id: credentials.id,
            source_id: credentials.source_id,
            account_identifier: credentials.account_identifier,
            credentials_store,
            client_id: client_id.into(),
            client_secret,
            token_url: token_url.into(),
            http: reqwest::Client::new(),
            tokens: Mutex::new(tokens),
        })
    }

    async fn refresh(&self, current: &OAuthTokens) -> Result<OAuthTokens, ConnectorError> {
        let refresh_token = current
            .refresh_token
            .clone()
            .ok_or(ConnectorError::AuthRequired)?;

        let client = BasicClient::new(ClientId::new(self.client_id.clone()));
        let client = if let Some(secret) = &self.client_secret {
            client.set_client_secret(ClientSecret::new(secret.clone()))
        } else {
            client
        };
        let client = client.set_token_uri(
            TokenUrl::new(self.token_url.clone())
                .map_err(|e| ConnectorError::transport("oauth token url", e))?,
        );

        let response = client
            .exchange_refresh_token(&RefreshToken::new(refresh_token))
            .request_async(&self.http)
            .await
            .map_err(|e| ConnectorError::AuthInvalid(format!("token refresh failed: {e}")))?;

        let expires_in = response
            .expires_in()
            .unwrap_or(std::time::Duration::from_secs(3600));

        Ok(OAuthTokens {
            access_token: response.access_token().secret().clone(),
            refresh_token: response
                .refresh_token()
                .map(|t| t.secret().clone())
                .or_else(|| current.refresh_token.clone()),
            expires_at: Utc::now() + Duration::from_std(expires_in).unwrap_or(Duration::hours(1)),
        })
    }
}

#[async_trait]
impl TokenProvider for OAuthTokenProvider {
    async fn get_token(&self, ctx: CancellationToken) -> Result<String, ConnectorError> {
        let mut guard = self.tokens.lock().await;

        if !guard.expires_within(expiry_buffer()) {
            return Ok(guard.access_token.clone());
        }

        if ctx.is_cancelled() {
            return Err(ConnectorError::Cancelled);
        }

        tracing::debug!(credentials_id = %self.credentials_id, "access token near expiry, refreshing");
        let refreshed = self.refresh(&guard).await?;

        self.credentials_store
            .save(&Credentials {
                id: self.credentials_id.clone(),
                source_id: self.source_id.clone(),
                account_identifier: self.account_identifier.clone(),
                secret: CredentialSecret::OAuth(refreshed.clone()),
            })
            .await
            .map_err(|e| ConnectorError::transport("persist refreshed token", anyhow::anyhow!(e)))?;

        let access_token = refreshed.access_token.clone();
        *guard = refreshed;
        Ok(access_token)
    }
}
