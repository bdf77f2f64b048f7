//! Shared test helpers for provider adapter integration tests.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use sercha_connectors::ProviderClient;
use sercha_core::connector::{ConnectorError, TokenProvider};
use sercha_ratelimit::{RateLimitConfig, RateLimiter};

pub struct FixedTokenProvider;

#[async_trait]
impl TokenProvider for FixedTokenProvider {
    async fn get_token(&self, _ctx: CancellationToken) -> Result<String, ConnectorError> {
        Ok("test-access-token".to_string())
    }
}

/// Builds a [`ProviderClient`] pointed at a mock server with an
/// unthrottled rate limiter, for tests that don't exercise governor
/// behavior directly.
pub fn test_client(base_url: &str) -> ProviderClient {
    ProviderClient::new(
        base_url,
        Arc::new(FixedTokenProvider) as Arc<dyn TokenProvider>,
        Arc::new(RateLimiter::new(RateLimitConfig::code_host())),
    )
}
