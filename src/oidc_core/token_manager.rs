//! The token manager the glue delegates to.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::config::{OidcConfig, ProviderMetadata};
use super::context::BrowserContext;
use super::http_client::HttpRequest;
use super::response::{build_url, SigninResponse};
use super::types::{OidcError, User};

const STATE_PREFIX: &str = "oidc.";
const USER_PREFIX: &str = "oidc.user:";

/// Claims that describe the protocol exchange rather than the user.
const PROTOCOL_CLAIMS: &[&str] = &["nonce", "at_hash", "c_hash", "iat", "nbf", "exp", "aud", "iss", "auth_time", "azp"];

/// Token acquisition, storage and expiry tracking.
#[async_trait]
pub trait TokenManager: Send + Sync + 'static {
    /// The browser facilities this manager runs against.
    fn context(&self) -> &BrowserContext;

    /// The stored user, if any.
    fn get_user(&self) -> Result<Option<User>, OidcError>;

    /// True when no user is stored or the stored one has expired.
    fn is_expired(&self) -> Result<bool, OidcError> {
        Ok(self.get_user()?.is_none_or(|user| user.is_expired()))
    }

    /// Sends the browser to the provider's authorization endpoint. Returns the URL.
    fn signin_redirect(&self) -> Result<String, OidcError>;

    /// Completes the flow from the URL the provider redirected back to.
    async fn signin_redirect_callback(&self, url: &str) -> Result<User, OidcError>;

    /// Forgets the stored user.
    fn remove_user(&self);

    /// Ends the provider session as well as the local one. Returns the URL.
    fn signout_redirect(&self) -> Result<String, OidcError>;
}

/// Request bookkeeping kept across the redirect.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SigninState {
    id: String,
    nonce: Option<String>,
    created: i64,
}

fn state_key(id: &str) -> String {
    format!("{}{}", STATE_PREFIX, id)
}

/// Reads id_token claims. Signatures are trusted to the provider channel.
fn decode_claims(id_token: &str) -> Result<Map<String, Value>, OidcError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();
    decode::<Map<String, Value>>(id_token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims)
        .map_err(|e| OidcError::InvalidToken(format!("malformed id_token: {}", e)))
}

/// Implicit-flow token manager backed by [`WebStorage`](super::storage::WebStorage).
pub struct ImplicitTokenManager {
    config: OidcConfig,
    metadata: ProviderMetadata,
    ctx: BrowserContext,
}

impl ImplicitTokenManager {
    /// Validates `config` and builds a manager over `ctx`.
    pub fn new(config: OidcConfig, ctx: BrowserContext) -> Result<Self, OidcError> {
        config.validate()?;
        let metadata = config.resolved_metadata();
        if config.load_user_info {
            if ctx.http_client.is_none() {
                return Err(OidcError::Config("load_user_info needs an http client".into()));
            }
            if metadata.userinfo_endpoint.is_none() {
                return Err(OidcError::Config("load_user_info needs a userinfo_endpoint".into()));
            }
        }
        Ok(ImplicitTokenManager { config, metadata, ctx })
    }

    /// The configuration this manager was built from.
    pub fn config(&self) -> &OidcConfig {
        &self.config
    }

    /// The endpoints in use.
    pub fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    /// Stores `user` as the current token record.
    pub fn store_user(&self, user: &User) -> Result<(), OidcError> {
        let json = serde_json::to_string(user)?;
        self.ctx.storage.set_item(&self.config.user_store_key(), &json)
    }

    /// Deletes pending sign-in requests older than `max_age`. Returns how many went.
    pub fn clear_stale_state(&self, max_age: Duration) -> usize {
        let cutoff = Utc::now().timestamp() - max_age.num_seconds();
        let storage = &self.ctx.storage;
        let mut removed = 0;
        for key in storage.keys() {
            if !key.starts_with(STATE_PREFIX) || key.starts_with(USER_PREFIX) {
                continue;
            }
            let stale = storage
                .get_item(&key)
                .and_then(|raw| serde_json::from_str::<SigninState>(&raw).ok())
                .is_none_or(|state| state.created < cutoff);
            if stale {
                storage.remove_item(&key);
                removed += 1;
            }
        }
        debug!(removed, "cleared stale sign-in state");
        removed
    }

    fn take_state(&self, id: &str) -> Result<Option<SigninState>, OidcError> {
        let key = state_key(id);
        let raw = self.ctx.storage.get_item(&key);
        self.ctx.storage.remove_item(&key);
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn load_user_info(&self, access_token: &str) -> Result<Map<String, Value>, OidcError> {
        let (Some(client), Some(endpoint)) = (&self.ctx.http_client, &self.metadata.userinfo_endpoint) else {
            return Err(OidcError::Config("load_user_info needs an http client and a userinfo_endpoint".into()));
        };
        let response = client
            .execute(HttpRequest::get_json(endpoint.clone()).bearer(access_token))
            .await
            .map_err(|e| OidcError::Http(e.to_string()))?;
        if response.status != 200 {
            return Err(OidcError::Http(format!("userinfo endpoint answered {}", response.status)));
        }
        match serde_json::from_slice::<Value>(&response.body) {
            Ok(Value::Object(claims)) => Ok(claims),
            _ => Err(OidcError::Http("userinfo response is not a JSON object".into())),
        }
    }
}

#[async_trait]
impl TokenManager for ImplicitTokenManager {
    fn context(&self) -> &BrowserContext {
        &self.ctx
    }

    fn get_user(&self) -> Result<Option<User>, OidcError> {
        match self.ctx.storage.get_item(&self.config.user_store_key()) {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn signin_redirect(&self) -> Result<String, OidcError> {
        let id = Uuid::new_v4().simple().to_string();
        let nonce = self.config.requests_id_token().then(|| Uuid::new_v4().simple().to_string());
        let state = SigninState { id: id.clone(), nonce: nonce.clone(), created: Utc::now().timestamp() };
        self.ctx.storage.set_item(&state_key(&id), &serde_json::to_string(&state)?)?;

        let mut params = vec![
            ("client_id", self.config.client_id.clone()),
            ("redirect_uri", self.config.redirect_uri.clone()),
            ("response_type", self.config.response_type.clone()),
            ("scope", self.config.scope.clone()),
            ("state", id),
        ];
        if let Some(nonce) = nonce {
            params.push(("nonce", nonce));
        }
        if let Some(prompt) = &self.config.prompt {
            params.push(("prompt", prompt.clone()));
        }
        for (k, v) in &self.config.extra_query_params {
            params.push((k.as_str(), v.clone()));
        }
        let url = build_url(&self.metadata.authorization_endpoint, &params);
        info!(authority = %self.config.authority, "redirecting to identity provider");
        self.ctx.navigator.navigate(&url);
        Ok(url)
    }

    #[instrument(skip(self, url), level = "debug")]
    async fn signin_redirect_callback(&self, url: &str) -> Result<User, OidcError> {
        let response = SigninResponse::from_url(url)?;
        let stored = match &response.state {
            Some(id) => self.take_state(id)?,
            None => None,
        };
        if let Some(err) = response.provider_error() {
            return Err(err);
        }
        let Some(id) = &response.state else {
            return Err(OidcError::State("callback carries no state".into()));
        };
        let stored = stored.ok_or_else(|| OidcError::State(format!("no matching state found for {}", id)))?;

        let mut profile = Map::new();
        if self.config.requests_id_token() {
            let id_token = response
                .id_token
                .as_deref()
                .ok_or_else(|| OidcError::InvalidToken("expected an id_token in the response".into()))?;
            let claims = decode_claims(id_token)?;
            if let Some(expected) = stored.nonce.as_deref() {
                if claims.get("nonce").and_then(Value::as_str) != Some(expected) {
                    return Err(OidcError::InvalidToken("nonce mismatch".into()));
                }
            }
            if claims.get("sub").is_none() {
                return Err(OidcError::InvalidToken("id_token has no sub claim".into()));
            }
            profile = claims;
        }
        if self.config.requests_access_token() && response.access_token.is_none() {
            return Err(OidcError::InvalidToken("expected an access_token in the response".into()));
        }

        if self.config.load_user_info {
            if let Some(access_token) = &response.access_token {
                let claims = self.load_user_info(access_token).await?;
                if let (Some(ours), Some(theirs)) = (profile.get("sub"), claims.get("sub")) {
                    if ours != theirs {
                        return Err(OidcError::InvalidToken("userinfo sub does not match id_token".into()));
                    }
                }
                profile.extend(claims);
            }
        }
        if self.config.filter_protocol_claims {
            for claim in PROTOCOL_CLAIMS {
                profile.remove(*claim);
            }
        }

        let expires_at = match response.expires_in {
            Some(secs) => Some(
                Utc::now()
                    .timestamp()
                    .checked_add(secs)
                    .ok_or_else(|| OidcError::InvalidToken("expires_in out of range".into()))?,
            ),
            None => None,
        };
        let user = User {
            id_token: response.id_token,
            access_token: response.access_token,
            token_type: response.token_type,
            scope: response.scope.or_else(|| Some(self.config.scope.clone())),
            profile,
            expires_at,
        };
        self.store_user(&user)?;
        debug!(sub = ?user.subject(), "user stored");
        Ok(user)
    }

    fn remove_user(&self) {
        self.ctx.storage.remove_item(&self.config.user_store_key());
    }

    fn signout_redirect(&self) -> Result<String, OidcError> {
        let endpoint = self
            .metadata
            .end_session_endpoint
            .clone()
            .ok_or_else(|| OidcError::Config("provider has no end_session_endpoint".into()))?;
        let mut params = Vec::new();
        if let Some(id_token) = self.get_user()?.and_then(|user| user.id_token) {
            params.push(("id_token_hint", id_token));
        }
        if let Some(uri) = &self.config.post_logout_redirect_uri {
            params.push(("post_logout_redirect_uri", uri.clone()));
        }
        let url = build_url(&endpoint, &params);
        self.remove_user();
        info!(authority = %self.config.authority, "ending identity provider session");
        self.ctx.navigator.navigate(&url);
        Ok(url)
    }
}
