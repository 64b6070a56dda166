pub mod oidc_core;
pub mod openid;

pub mod callback;
pub mod helpers;
pub mod middleware;
pub mod store;

pub use oidc_core::config::{OidcConfig, ProviderMetadata};
pub use oidc_core::context::BrowserContext;
pub use oidc_core::http_client::{HttpClientError, HttpRequest, HttpResponse, InMemoryHttpClient, OAuthHttpClient};
#[cfg(feature = "reqwest")]
pub use oidc_core::http_client::ReqwestHttpClient;
pub use oidc_core::navigator::{MemoryNavigator, Navigator};
pub use oidc_core::storage::{InMemoryStorage, WebStorage, PENDING_LOCATION_KEY};
pub use oidc_core::token_manager::{ImplicitTokenManager, TokenManager};
pub use oidc_core::types::{OidcError, User};

pub use callback::{CallbackOutcome, CallbackPhase, CallbackView};
pub use helpers::{create_token_manager, logout, logout_at_identity_service};
pub use middleware::{create_oidc_middleware, OidcMiddleware, ShouldValidate};
pub use openid::discovery::discover;
pub use store::{Dispatched, LoggingMiddleware, Middleware, Next, Store};
