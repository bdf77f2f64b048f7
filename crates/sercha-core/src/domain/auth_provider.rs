//! AuthProvider domain entity
//!
//! Shared across many `Source`s; an `AuthProvider` cannot be deleted while
//! any source references it (reference-counted deletion, enforced by the
//! store).

use serde::{Deserialize, Serialize};

use super::newtypes::AuthProviderId;

/// How a provider's connectors authenticate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// OAuth 2.0 authorization-code flow (the callback server itself is
    /// an excluded collaborator; only the resulting tokens are modeled
    /// here).
    OAuth,
    /// A long-lived personal access token.
    PersonalAccessToken,
}

/// A shared authentication configuration, referenced by zero or more
/// sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthProvider {
    /// Stable identifier.
    pub id: AuthProviderId,
    /// Human-readable name.
    pub name: String,
    /// Provider type tag this auth configuration targets (e.g. `"github"`).
    pub provider_type: String,
    /// Authentication method.
    pub auth_method: AuthMethod,
    /// OAuth client configuration, as an opaque JSON blob, when
    /// `auth_method` is `OAuth`.
    pub oauth_config: Option<serde_json::Value>,
}

impl AuthProvider {
    /// Builds a new auth provider.
    #[must_use]
    pub fn new(
        id: AuthProviderId,
        name: impl Into<String>,
        provider_type: impl Into<String>,
        auth_method: AuthMethod,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            provider_type: provider_type.into(),
            auth_method,
            oauth_config: None,
        }
    }
}
