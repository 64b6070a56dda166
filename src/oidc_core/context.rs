use std::sync::Arc;

use super::http_client::OAuthHttpClient;
use super::navigator::Navigator;
use super::storage::WebStorage;

/// The browser facilities the glue and its token manager run against.
///
/// Cloning is cheap; clones share the same storage and navigator.
#[derive(Clone)]
pub struct BrowserContext {
    /// Durable key/value store for the token record and pending location.
    pub storage: Arc<dyn WebStorage>,
    /// Location access and full-page navigation.
    pub navigator: Arc<dyn Navigator>,
    /// Transport for userinfo and discovery calls.
    pub http_client: Option<Arc<dyn OAuthHttpClient>>,
}

impl BrowserContext {
    /// Creates a context without an HTTP client.
    pub fn new(storage: Arc<dyn WebStorage>, navigator: Arc<dyn Navigator>) -> Self {
        BrowserContext { storage, navigator, http_client: None }
    }

    /// Sets the HTTP client.
    pub fn with_http_client(mut self, client: Arc<dyn OAuthHttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }
}
