use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use std::error::Error;
use dashmap::DashMap;
use std::sync::Arc;

/// Timeout applied to provider calls unless the caller picks another.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// GET request sent to the identity provider.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Target URL.
    pub url: String,
    /// Request headers.
    pub headers: Vec<(String, String)>,
    /// Timeout for the whole call.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// A GET request with an `Accept: application/json` header and the default timeout.
    pub fn get_json(url: impl Into<String>) -> Self {
        HttpRequest {
            url: url.into(),
            headers: vec![("Accept".to_string(), "application/json".to_string())],
            timeout: Some(DEFAULT_TIMEOUT),
        }
    }

    /// Overrides the timeout. `None` leaves the call unbounded.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Adds a `Authorization: Bearer` header.
    pub fn bearer(mut self, token: &str) -> Self {
        self.headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
        self
    }
}

/// HTTP response from executing a call.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: Vec<(String, String)>,
    /// Response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// A 200 response carrying a JSON body.
    pub fn json(value: &serde_json::Value) -> Self {
        HttpResponse {
            status: 200,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: serde_json::to_vec(value).unwrap_or_default(),
        }
    }
}

/// Error type for HTTP client operations.
pub type HttpClientError = Box<dyn Error + Send + Sync>;

/// Generic HTTP client interface for provider calls.
pub trait OAuthHttpClient: Send + Sync + 'static {
    /// Execute an HTTP request asynchronously.
    fn execute(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpClientError>> + Send + 'static>>;
}

/// In-memory HTTP client stub for testing.
#[derive(Clone, Default)]
pub struct InMemoryHttpClient {
    responses: Arc<DashMap<String, HttpResponse>>,
    requests: Arc<DashMap<String, HttpRequest>>,
    default_response: Option<HttpResponse>,
}

impl InMemoryHttpClient {
    /// Creates a new in-memory HTTP client with no default response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory HTTP client with a default response on miss.
    pub fn with_default(response: HttpResponse) -> Self {
        Self { default_response: Some(response), ..Self::default() }
    }

    /// Register a mock response for a specific URL.
    pub fn insert_response(&self, url: impl Into<String>, response: HttpResponse) {
        self.responses.insert(url.into(), response);
    }

    /// Last request seen for `url`.
    pub fn request_for(&self, url: &str) -> Option<HttpRequest> {
        self.requests.get(url).map(|entry| entry.value().clone())
    }
}

impl OAuthHttpClient for InMemoryHttpClient {
    fn execute(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpClientError>> + Send + 'static>> {
        let responses = self.responses.clone();
        let default = self.default_response.clone();
        let url = request.url.clone();
        self.requests.insert(url.clone(), request);
        Box::pin(async move {
            if let Some(entry) = responses.get(&url) {
                Ok(entry.value().clone())
            } else if let Some(resp) = default {
                Ok(resp)
            } else {
                Err("no mock response for url".into())
            }
        })
    }
}

/// HTTP client backed by reqwest.
#[cfg(feature = "reqwest")]
#[derive(Clone, Default)]
pub struct ReqwestHttpClient {
    inner: reqwest::Client,
}

#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
    /// Wraps an existing reqwest client.
    pub fn new(inner: reqwest::Client) -> Self {
        ReqwestHttpClient { inner }
    }
}

#[cfg(feature = "reqwest")]
impl OAuthHttpClient for ReqwestHttpClient {
    fn execute(
        &self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpClientError>> + Send + 'static>> {
        let client = self.inner.clone();
        Box::pin(async move {
            let mut builder = client.get(&request.url);
            for (k, v) in &request.headers {
                builder = builder.header(k.as_str(), v.as_str());
            }
            if let Some(timeout) = request.timeout {
                builder = builder.timeout(timeout);
            }
            let resp = builder.send().await?;
            let status = resp.status().as_u16();
            let headers = resp
                .headers()
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
                .collect();
            let body = resp.bytes().await?.to_vec();
            Ok(HttpResponse { status, headers, body })
        })
    }
}
