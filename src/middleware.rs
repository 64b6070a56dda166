use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::{debug, info};

use crate::helpers::create_token_manager;
use crate::oidc_core::config::OidcConfig;
use crate::oidc_core::context::BrowserContext;
use crate::oidc_core::storage::save_pending_location;
use crate::oidc_core::token_manager::TokenManager;
use crate::oidc_core::types::OidcError;
use crate::store::{Dispatched, Middleware, Next, Store};

/// Decides whether an action needs a valid token.
pub type ShouldValidate<S, A> = Arc<dyn Fn(&S, &A) -> bool + Send + Sync>;

/// Store middleware that sends the browser to the identity provider whenever
/// an action is dispatched without a live token.
///
/// Every action is validated unless a predicate says otherwise, so an
/// application with public routes has to exempt their actions through
/// [`OidcMiddleware::should_validate`].
pub struct OidcMiddleware<S, A> {
    config: OidcConfig,
    ctx: BrowserContext,
    should_validate: ShouldValidate<S, A>,
    dispatch_on_invalid: Option<A>,
    manager: OnceCell<Arc<dyn TokenManager>>,
}

impl<S: 'static, A: 'static> OidcMiddleware<S, A> {
    /// Validates every action against a token manager built lazily from `config`.
    pub fn new(config: OidcConfig, ctx: BrowserContext) -> Self {
        OidcMiddleware {
            config,
            ctx,
            should_validate: Arc::new(|_: &S, _: &A| true),
            dispatch_on_invalid: None,
            manager: OnceCell::new(),
        }
    }

    /// Only validate actions for which `predicate` returns true.
    pub fn should_validate(mut self, predicate: impl Fn(&S, &A) -> bool + Send + Sync + 'static) -> Self {
        self.should_validate = Arc::new(predicate);
        self
    }

    /// Dispatches `action` down the chain before redirecting.
    pub fn dispatch_on_invalid(mut self, action: A) -> Self {
        self.dispatch_on_invalid = Some(action);
        self
    }

    /// Uses `manager` instead of building one from the configuration.
    pub fn token_manager(mut self, manager: Arc<dyn TokenManager>) -> Self {
        self.manager = OnceCell::with_value(manager);
        self
    }

    fn manager(&self) -> Result<&Arc<dyn TokenManager>, OidcError> {
        self.manager.get_or_try_init(|| {
            let manager = create_token_manager(self.config.clone(), self.ctx.clone())?;
            Ok(Arc::new(manager) as Arc<dyn TokenManager>)
        })
    }
}

/// Builds the validation middleware. `None` keeps the defaults: validate
/// every action, dispatch nothing before redirecting.
pub fn create_oidc_middleware<S: 'static, A: 'static>(
    config: OidcConfig,
    ctx: BrowserContext,
    should_validate: Option<ShouldValidate<S, A>>,
    dispatch_on_invalid: Option<A>,
) -> OidcMiddleware<S, A> {
    let mut middleware = OidcMiddleware::new(config, ctx);
    if let Some(predicate) = should_validate {
        middleware.should_validate = predicate;
    }
    middleware.dispatch_on_invalid = dispatch_on_invalid;
    middleware
}

impl<S, A> Middleware<S, A> for OidcMiddleware<S, A>
where
    S: Clone + Send + Sync + 'static,
    A: Clone + Send + Sync + 'static,
{
    fn handle(&self, store: &Store<S, A>, action: A, next: Next<'_, S, A>) -> Result<Dispatched, OidcError> {
        if !store.with_state(|state| (self.should_validate)(state, &action)) {
            return next.run(action);
        }
        let manager = self.manager()?;
        if !manager.is_expired()? {
            debug!("token valid, passing action through");
            return next.run(action);
        }

        info!(client_id = %self.config.client_id, "token missing or expired");
        if let Some(notice) = &self.dispatch_on_invalid {
            next.run(notice.clone())?;
        }
        let location = self.ctx.navigator.current_location();
        save_pending_location(&*self.ctx.storage, &location)?;
        let url = manager.signin_redirect()?;
        Ok(Dispatched::Redirected(url))
    }
}
