//! Credentials domain entity
//!
//! Exactly one of an OAuth credential pair or a personal access token is
//! held at any time; modeled as an enum so the "exactly one populated"
//! invariant is enforced by the type system rather than by a runtime
//! check over two nullable columns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{CredentialsId, SourceId};

/// OAuth token pair stored for a source's credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OAuthTokens {
    /// Bearer token for authenticating API requests.
    pub access_token: String,
    /// Token for refreshing the access token without user interaction.
    pub refresh_token: Option<String>,
    /// When the access token expires.
    pub expires_at: DateTime<Utc>,
}

impl OAuthTokens {
    /// Returns true if the access token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Returns true if the access token will expire within `duration`.
    #[must_use]
    pub fn expires_within(&self, duration: chrono::Duration) -> bool {
        Utc::now() + duration >= self.expires_at
    }
}

/// The secret half of a `Credentials` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CredentialSecret {
    /// OAuth token pair.
    OAuth(OAuthTokens),
    /// A long-lived personal access token.
    PersonalAccessToken(String),
}

/// Stored credentials for one source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    /// Stable identifier.
    pub id: CredentialsId,
    /// Owning source.
    pub source_id: SourceId,
    /// Provider-reported account identifier (email, username, ...),
    /// obtained via `Connector::get_account_identifier`.
    pub account_identifier: String,
    /// The secret payload.
    pub secret: CredentialSecret,
}

impl Credentials {
    /// Builds a new credentials record.
    #[must_use]
    pub fn new(
        id: CredentialsId,
        source_id: SourceId,
        account_identifier: impl Into<String>,
        secret: CredentialSecret,
    ) -> Self {
        Self {
            id,
            source_id,
            account_identifier: account_identifier.into(),
            secret,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oauth_tokens_expiry() {
        let tokens = OAuthTokens {
            access_token: "t".into(),
            refresh_token: None,
            expires_at: Utc::now() - chrono::Duration::seconds(1),
        };
        assert!(tokens.is_expired());
    }
}
