//! Shared provider HTTP plumbing
//!
//! A thin typed wrapper over `reqwest`: one base URL, a
//! [`TokenProvider`] consulted per call, and a [`RateLimiter`] waited on
//! before every request and updated from every response. One base URL
//! per provider family, rather than one fixed Graph API host.

use std::time::Duration;

use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use sercha_core::connector::{ConnectorError, TokenProvider};
use sercha_ratelimit::RateLimiter;
use tokio_util::sync::CancellationToken;

/// Each call inherits this provider-level default timeout, whichever is
/// shorter against the caller's own deadline (the caller enforces its
/// deadline via `ctx` cancellation).
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A call is retried at most this many times after a 429, each time
/// waiting on the rate limiter's reactive state before resending.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

#[derive(Clone)]
pub struct ProviderClient {
    http: reqwest::Client,
    base_url: String,
    token_provider: std::sync::Arc<dyn TokenProvider>,
    rate_limiter: std::sync::Arc<RateLimiter>,
}

impl ProviderClient {
    #[must_use]
    pub fn new(
        base_url: impl Into<String>,
        token_provider: std::sync::Arc<dyn TokenProvider>,
        rate_limiter: std::sync::Arc<RateLimiter>,
    ) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .expect("reqwest client builds with default TLS backend"),
            base_url: base_url.into(),
            token_provider,
            rate_limiter,
        }
    }

    /// Issues a GET request against `path` with the given query pairs
    /// and decodes the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        ctx: &CancellationToken,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ConnectorError> {
        let response = self.send(ctx, Method::GET, path, query).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| ConnectorError::decode(path.to_string(), e))
    }

    /// Issues a GET request authenticated with an explicit bearer token
    /// rather than the configured `TokenProvider`, bypassing the rate
    /// limiter. Used only for the one-shot account-identifier lookup
    /// that runs during authentication, before any `TokenProvider` for
    /// the source exists.
    pub async fn get_json_with_token<T: DeserializeOwned>(
        &self,
        access_token: &str,
        path: &str,
    ) -> Result<T, ConnectorError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ConnectorError::transport(path.to_string(), e))?;

        match response.status() {
            s if s.is_success() => response
                .json::<T>()
                .await
                .map_err(|e| ConnectorError::decode(path.to_string(), e)),
            StatusCode::UNAUTHORIZED => Err(ConnectorError::AuthInvalid(format!("{path} returned 401"))),
            s => Err(ConnectorError::transport(path.to_string(), anyhow::anyhow!("unexpected status {s}"))),
        }
    }

    /// Issues a GET request and returns the raw response body bytes,
    /// for content export endpoints that don't return JSON.
    pub async fn get_bytes(
        &self,
        ctx: &CancellationToken,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<u8>, ConnectorError> {
        let response = self.send(ctx, Method::GET, path, query).await?;
        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| ConnectorError::transport(path.to_string(), e))
    }

    async fn send(
        &self,
        ctx: &CancellationToken,
        method: Method,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Response, ConnectorError> {
        let url = format!("{}{}", self.base_url, path);

        for attempt in 0..=MAX_RATE_LIMIT_RETRIES {
            self.rate_limiter
                .wait(ctx)
                .await
                .map_err(|_| ConnectorError::Cancelled)?;

            let token = self.token_provider.get_token(ctx.clone()).await?;
            let response = self
                .http
                .request(method.clone(), &url)
                .bearer_auth(token)
                .query(query)
                .send()
                .await
                .map_err(|e| ConnectorError::transport(path.to_string(), e))?;

            let status = response.status();
            self.rate_limiter
                .update_from_response(status == StatusCode::TOO_MANY_REQUESTS, response.headers());

            if status == StatusCode::TOO_MANY_REQUESTS {
                if attempt < MAX_RATE_LIMIT_RETRIES {
                    tracing::warn!(path, attempt, "rate limited, waiting on governor before retry");
                    continue;
                }
                return Err(ConnectorError::RateLimited { retry_after_secs: 0 });
            }

            return match status {
                StatusCode::NOT_FOUND => Err(ConnectorError::NotFound),
                StatusCode::FORBIDDEN => Err(ConnectorError::Forbidden(path.to_string())),
                StatusCode::UNAUTHORIZED => {
                    Err(ConnectorError::AuthInvalid(format!("{path} returned 401")))
                }
                StatusCode::GONE => Err(ConnectorError::SyncTokenExpired),
                s if s.is_success() => Ok(response),
                s => Err(ConnectorError::transport(
                    path.to_string(),
                    anyhow::anyhow!("unexpected status {s}"),
                )),
            };
        }

        unreachable!("loop always returns on its last iteration")
    }
}
