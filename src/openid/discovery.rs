use serde::Deserialize;
use tracing::{debug, instrument};

use crate::oidc_core::config::ProviderMetadata;
use crate::oidc_core::http_client::{HttpRequest, OAuthHttpClient};
use crate::oidc_core::types::OidcError;

/// Result of parsing /.well-known/openid-configuration
#[derive(Debug, Deserialize)]
pub struct OidcDiscovery {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub userinfo_endpoint: Option<String>,
    pub end_session_endpoint: Option<String>,
    pub jwks_uri: Option<String>,
    #[serde(default)]
    pub response_types_supported: Vec<String>,
    // …other optional fields…
}

impl From<OidcDiscovery> for ProviderMetadata {
    fn from(disc: OidcDiscovery) -> Self {
        ProviderMetadata {
            issuer: disc.issuer,
            authorization_endpoint: disc.authorization_endpoint,
            userinfo_endpoint: disc.userinfo_endpoint,
            end_session_endpoint: disc.end_session_endpoint,
        }
    }
}

/// Discovery document location for `authority`.
pub fn discovery_url(authority: &str) -> String {
    format!("{}/.well-known/openid-configuration", authority.trim_end_matches('/'))
}

/// Fetches the discovery document of `authority`.
#[instrument(skip(client), level = "debug")]
pub async fn fetch_discovery(client: &dyn OAuthHttpClient, authority: &str) -> Result<OidcDiscovery, OidcError> {
    let url = discovery_url(authority);
    let response = client
        .execute(HttpRequest::get_json(url.clone()))
        .await
        .map_err(|e| OidcError::Http(e.to_string()))?;
    if response.status != 200 {
        return Err(OidcError::Http(format!("{} answered {}", url, response.status)));
    }
    let disc: OidcDiscovery = serde_json::from_slice(&response.body)
        .map_err(|e| OidcError::Http(format!("malformed discovery document: {}", e)))?;
    debug!(issuer = %disc.issuer, "discovery document loaded");
    Ok(disc)
}

/// Fetches the provider endpoints of `authority`, ready for `OidcConfig::with_metadata`.
pub async fn discover(client: &dyn OAuthHttpClient, authority: &str) -> Result<ProviderMetadata, OidcError> {
    fetch_discovery(client, authority).await.map(ProviderMetadata::from)
}
