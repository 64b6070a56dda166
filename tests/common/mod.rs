#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Map, Value};
use starberry_oidc::oidc_core::response::parse_params;
use starberry_oidc::{BrowserContext, InMemoryStorage, MemoryNavigator, OidcConfig, User, WebStorage};

pub fn config() -> OidcConfig {
    OidcConfig::new("app", "https://x/cb", "id_token token", "openid", "https://idp")
}

pub fn browser(storage: &InMemoryStorage, href: &str) -> (BrowserContext, MemoryNavigator) {
    let navigator = MemoryNavigator::new(href);
    let ctx = BrowserContext::new(Arc::new(storage.clone()), Arc::new(navigator.clone()));
    (ctx, navigator)
}

pub fn query_of(url: &str) -> HashMap<String, String> {
    parse_params(url.split_once('?').map(|(_, q)| q).unwrap_or(""))
}

pub fn id_token(claims: Value) -> String {
    encode(&Header::default(), &claims, &EncodingKey::from_secret(b"test-secret")).unwrap()
}

/// The fragment the provider would send back for `authorize_url`.
pub fn provider_response(authorize_url: &str) -> String {
    let params = query_of(authorize_url);
    let token = id_token(json!({
        "sub": "alice",
        "name": "Alice",
        "nonce": params["nonce"],
        "iss": "https://idp",
        "aud": "app",
        "iat": Utc::now().timestamp(),
        "exp": Utc::now().timestamp() + 3600,
    }));
    format!(
        "https://x/cb#id_token={}&access_token=tok-1&token_type=Bearer&expires_in=3600&scope=openid&state={}",
        token, params["state"]
    )
}

pub fn user_expiring_at(expires_at: i64) -> User {
    User {
        id_token: Some("stored-id-token".into()),
        access_token: Some("tok".into()),
        token_type: Some("Bearer".into()),
        scope: Some("openid".into()),
        profile: Map::new(),
        expires_at: Some(expires_at),
    }
}

pub fn put_user(storage: &InMemoryStorage, config: &OidcConfig, user: &User) {
    storage
        .set_item(&config.user_store_key(), &serde_json::to_string(user).unwrap())
        .unwrap();
}

pub fn live_user() -> User {
    user_expiring_at(Utc::now().timestamp() + 3600)
}

pub fn expired_user() -> User {
    user_expiring_at(Utc::now().timestamp() - 10)
}
