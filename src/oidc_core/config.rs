//! Client configuration for the implicit flow.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::Url;

use super::types::OidcError;

/// Endpoints of the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderMetadata {
    /// Issuer identifier.
    pub issuer: String,
    /// Where the browser is sent to authenticate.
    pub authorization_endpoint: String,
    /// Userinfo endpoint, used when `load_user_info` is on.
    pub userinfo_endpoint: Option<String>,
    /// End-session endpoint used by identity-service logout.
    pub end_session_endpoint: Option<String>,
}

impl ProviderMetadata {
    /// Conventional endpoints under `authority` (`/connect/...`).
    pub fn from_authority(authority: &str) -> Self {
        let base = authority.trim_end_matches('/');
        ProviderMetadata {
            issuer: base.to_string(),
            authorization_endpoint: format!("{}/connect/authorize", base),
            userinfo_endpoint: Some(format!("{}/connect/userinfo", base)),
            end_session_endpoint: Some(format!("{}/connect/endsession", base)),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Configuration handed to every public entry point.
///
/// The five required fields are forwarded to the token manager verbatim;
/// the rest tune how it talks to the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OidcConfig {
    /// Client identifier registered with the provider.
    pub client_id: String,
    /// Absolute URL of the callback route.
    pub redirect_uri: String,
    /// Implicit-flow response type, e.g. `id_token token`.
    pub response_type: String,
    /// Space-delimited scopes.
    pub scope: String,
    /// Base URL of the identity provider.
    pub authority: String,
    /// Where the provider sends the browser after end-session.
    #[serde(default)]
    pub post_logout_redirect_uri: Option<String>,
    /// Optional `prompt` parameter.
    #[serde(default)]
    pub prompt: Option<String>,
    /// Provider-specific parameters appended to the authorization request.
    #[serde(default)]
    pub extra_query_params: BTreeMap<String, String>,
    /// Fetch userinfo claims after the callback.
    #[serde(default)]
    pub load_user_info: bool,
    /// Strip protocol claims (`nonce`, `iat`, ...) from the stored profile.
    #[serde(default = "default_true")]
    pub filter_protocol_claims: bool,
    /// Explicit endpoints; derived from `authority` when absent.
    #[serde(default)]
    pub metadata: Option<ProviderMetadata>,
}

impl OidcConfig {
    /// Creates a configuration from the five required fields.
    pub fn new(
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
        response_type: impl Into<String>,
        scope: impl Into<String>,
        authority: impl Into<String>,
    ) -> Self {
        OidcConfig {
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            response_type: response_type.into(),
            scope: scope.into(),
            authority: authority.into(),
            post_logout_redirect_uri: None,
            prompt: None,
            extra_query_params: BTreeMap::new(),
            load_user_info: false,
            filter_protocol_claims: true,
            metadata: None,
        }
    }

    /// Loads a configuration from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, OidcError> {
        serde_json::from_str(json).map_err(|e| OidcError::Config(e.to_string()))
    }

    /// Sets the post-logout redirect URI.
    pub fn post_logout_redirect_uri<S: Into<String>>(mut self, uri: S) -> Self {
        self.post_logout_redirect_uri = Some(uri.into());
        self
    }

    /// Sets the `prompt` parameter.
    pub fn prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Adds a provider-specific authorization parameter.
    pub fn extra_query_param<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.extra_query_params.insert(key.into(), value.into());
        self
    }

    /// Turns userinfo loading on or off.
    pub fn load_user_info(mut self, load: bool) -> Self {
        self.load_user_info = load;
        self
    }

    /// Turns protocol claim filtering on or off.
    pub fn filter_protocol_claims(mut self, filter: bool) -> Self {
        self.filter_protocol_claims = filter;
        self
    }

    /// Uses explicit provider endpoints.
    pub fn with_metadata(mut self, metadata: ProviderMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Explicit metadata, or the conventional endpoints under the authority.
    pub fn resolved_metadata(&self) -> ProviderMetadata {
        self.metadata
            .clone()
            .unwrap_or_else(|| ProviderMetadata::from_authority(&self.authority))
    }

    /// Whether an id_token is part of the requested response.
    pub fn requests_id_token(&self) -> bool {
        self.response_type.split_whitespace().any(|t| t == "id_token")
    }

    /// Whether an access token is part of the requested response.
    pub fn requests_access_token(&self) -> bool {
        self.response_type.split_whitespace().any(|t| t == "token")
    }

    /// Key under which the token manager keeps the user record.
    pub fn user_store_key(&self) -> String {
        format!("oidc.user:{}:{}", self.authority, self.client_id)
    }

    /// Checks the fields the token manager depends on.
    pub fn validate(&self) -> Result<(), OidcError> {
        if self.client_id.trim().is_empty() {
            return Err(OidcError::Config("client_id is required".into()));
        }
        if Url::parse(&self.redirect_uri).is_err() {
            return Err(OidcError::Config(format!("redirect_uri is not an absolute URL: {:?}", self.redirect_uri)));
        }
        if Url::parse(&self.authority).is_err() {
            return Err(OidcError::Config(format!("authority is not an absolute URL: {:?}", self.authority)));
        }
        let mut parts = self.response_type.split_whitespace().peekable();
        if parts.peek().is_none() {
            return Err(OidcError::Config("response_type is required".into()));
        }
        if let Some(bad) = parts.find(|t| *t != "id_token" && *t != "token") {
            return Err(OidcError::Config(format!("unsupported response_type component: {}", bad)));
        }
        if self.scope.trim().is_empty() {
            return Err(OidcError::Config("scope is required".into()));
        }
        if let Some(meta) = &self.metadata {
            if Url::parse(&meta.authorization_endpoint).is_err() {
                return Err(OidcError::Config("metadata.authorization_endpoint is not an absolute URL".into()));
            }
        }
        Ok(())
    }
}
