//! Provider type tag to connector constructor
//!
//! A plain string-keyed mapping, not an enum match: the sync engine
//! depends only on `dyn Connector`, so adding a provider here never
//! requires an engine change.

use std::sync::Arc;

use sercha_core::connector::{Connector, ConnectorError, TokenProvider};
use sercha_ratelimit::RateLimiter;

use crate::calendar::{CalendarConfig, CalendarConnector};
use crate::codehost::{CodeHostConfig, CodeHostConnector};
use crate::drive::{DriveConfig, DriveConnector};
use crate::http::ProviderClient;
use crate::mail::{MailConfig, MailConnector};

/// Base URLs for the providers this workspace ships adapters for.
/// Configurable per deployment via `Source::base_url_override` in a
/// future iteration; each of the four shipped providers uses one
/// well-known API host today.
mod base_url {
    pub const CODE_HOST: &str = "https://api.github.com";
    pub const MAIL: &str = "https://gmail.googleapis.com/gmail/v1";
    pub const DRIVE: &str = "https://www.googleapis.com/drive/v3";
    pub const CALENDAR: &str = "https://www.googleapis.com/calendar/v3";
}

/// Builds a connector instance for `provider_type`, bound to `source_id`
/// and authenticated via `token_provider`.
///
/// `configuration` is the source's free-form JSON config blob; each
/// adapter interprets it according to its own schema.
pub fn build_connector(
    provider_type: &str,
    source_id: &str,
    configuration: &serde_json::Value,
    token_provider: Arc<dyn TokenProvider>,
    rate_limiter: Arc<RateLimiter>,
) -> Result<Box<dyn Connector>, ConnectorError> {
    match provider_type {
        "code_host" | "github" => {
            let client = ProviderClient::new(base_url::CODE_HOST, token_provider, rate_limiter);
            let config = CodeHostConfig::from_json(configuration)?;
            Ok(Box::new(CodeHostConnector::new(source_id, client, config)))
        }
        "mail" | "gmail" => {
            let client = ProviderClient::new(base_url::MAIL, token_provider, rate_limiter);
            let config = MailConfig::from_json(configuration)?;
            Ok(Box::new(MailConnector::new(source_id, client, config)))
        }
        "drive" | "gdrive" => {
            let client = ProviderClient::new(base_url::DRIVE, token_provider, rate_limiter);
            let config = DriveConfig::from_json(configuration)?;
            Ok(Box::new(DriveConnector::new(source_id, client, config)))
        }
        "calendar" | "gcal" => {
            let client = ProviderClient::new(base_url::CALENDAR, token_provider, rate_limiter);
            let config = CalendarConfig::from_json(configuration)?;
            Ok(Box::new(CalendarConnector::new(source_id, client, config)))
        }
        other => Err(ConnectorError::InvalidInput(format!(
            "unknown provider type: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sercha_ratelimit::RateLimitConfig;
    use tokio_util::sync::CancellationToken;

    struct NullTokenProvider;

    #[async_trait::async_trait]
    impl TokenProvider for NullTokenProvider {
        async fn get_token(&self, _ctx: CancellationToken) -> Result<String, ConnectorError> {
            Ok("token".to_string())
        }
    }

    fn deps() -> (Arc<dyn TokenProvider>, Arc<RateLimiter>) {
        (
            Arc::new(NullTokenProvider),
            Arc::new(RateLimiter::new(RateLimitConfig::code_host())),
        )
    }

    #[test]
    fn builds_known_provider_types() {
        let (tokens, limiter) = deps();
        for tag in ["code_host", "github", "mail", "gmail", "drive", "gdrive"] {
            let config = if tag.starts_with("cal") {
                serde_json::json!({ "calendar_id": "primary" })
            } else {
                serde_json::json!({})
            };
            let connector = build_connector(tag, "src-1", &config, tokens.clone(), limiter.clone());
            assert!(connector.is_ok(), "expected {tag} to build");
        }
    }

    #[test]
    fn calendar_requires_calendar_id_in_configuration() {
        let (tokens, limiter) = deps();
        let err = build_connector("calendar", "src-1", &serde_json::json!({}), tokens, limiter);
        assert!(err.is_err());
    }

    #[test]
    fn rejects_unknown_provider_type() {
        let (tokens, limiter) = deps();
        let err = build_connector("fax", "src-1", &serde_json::json!({}), tokens, limiter);
        assert!(matches!(err, Err(ConnectorError::InvalidInput(_))));
    }
}
