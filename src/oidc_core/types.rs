//! OIDC client primitives: the stored user record and errors.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Token record persisted by the token manager after a successful sign-in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Raw identity token, when `id_token` was requested.
    pub id_token: Option<String>,
    /// Access token, when `token` was requested.
    pub access_token: Option<String>,
    /// Token type reported by the provider, usually `Bearer`.
    pub token_type: Option<String>,
    /// Granted scopes (space delimited).
    pub scope: Option<String>,
    /// Identity claims taken from the id_token and, optionally, userinfo.
    #[serde(default)]
    pub profile: Map<String, Value>,
    /// Expiry as unix seconds. `None` means the provider gave no lifetime.
    pub expires_at: Option<i64>,
}

impl User {
    /// Seconds left before expiry, relative to `now` (unix seconds).
    pub fn expires_in_at(&self, now: i64) -> Option<i64> {
        self.expires_at.map(|at| at.saturating_sub(now))
    }

    /// Seconds left before expiry.
    pub fn expires_in(&self) -> Option<i64> {
        self.expires_in_at(Utc::now().timestamp())
    }

    /// Whether the record is expired at `now` (unix seconds).
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Whether the record is expired right now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now().timestamp())
    }

    /// The `sub` claim, if the profile carries one.
    pub fn subject(&self) -> Option<&str> {
        self.profile.get("sub").and_then(Value::as_str)
    }
}

/// Errors surfaced by the OIDC glue and its token manager.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OidcError {
    /// Malformed or incomplete configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// The durable key/value store rejected or returned unreadable data.
    #[error("storage error: {0}")]
    Storage(String),
    /// The `state` parameter was missing or did not match a pending request.
    #[error("state error: {0}")]
    State(String),
    /// The identity provider answered with an error response.
    #[error("provider error: {error}{}", describe(.description))]
    Provider {
        /// OAuth2 `error` code.
        error: String,
        /// Optional `error_description`.
        description: Option<String>,
    },
    /// The redirect carried a token that could not be used.
    #[error("invalid token: {0}")]
    InvalidToken(String),
    /// Transport failure or unexpected HTTP response.
    #[error("http error: {0}")]
    Http(String),
}

fn describe(description: &Option<String>) -> String {
    description.as_deref().map(|d| format!(" ({d})")).unwrap_or_default()
}

impl From<serde_json::Error> for OidcError {
    fn from(err: serde_json::Error) -> Self {
        OidcError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(expires_at: Option<i64>) -> User {
        User {
            id_token: None,
            access_token: Some("at".into()),
            token_type: Some("Bearer".into()),
            scope: Some("openid".into()),
            profile: Map::new(),
            expires_at,
        }
    }

    #[test]
    fn expiry_is_inclusive_of_now() {
        assert!(user(Some(100)).is_expired_at(100));
        assert!(user(Some(99)).is_expired_at(100));
        assert!(!user(Some(101)).is_expired_at(100));
    }

    #[test]
    fn no_lifetime_never_expires() {
        assert!(!user(None).is_expired_at(i64::MAX));
    }

    #[test]
    fn extreme_expiry_values_do_not_overflow() {
        assert!(user(Some(i64::MIN)).is_expired_at(1_700_000_000));
        assert!(!user(Some(i64::MAX)).is_expired_at(-1));
        assert_eq!(user(Some(i64::MIN)).expires_in_at(1_700_000_000), Some(i64::MIN));
        assert_eq!(user(Some(i64::MAX)).expires_in_at(-1), Some(i64::MAX));
    }

    #[test]
    fn provider_error_display() {
        let err = OidcError::Provider { error: "access_denied".into(), description: Some("user said no".into()) };
        assert_eq!(err.to_string(), "provider error: access_denied (user said no)");
        let bare = OidcError::Provider { error: "login_required".into(), description: None };
        assert_eq!(bare.to_string(), "provider error: login_required");
    }
}
