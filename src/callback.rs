//! The view mounted at the redirect URI.

use std::sync::Arc;

use tracing::{info, warn};

use crate::helpers::create_token_manager;
use crate::oidc_core::config::OidcConfig;
use crate::oidc_core::context::BrowserContext;
use crate::oidc_core::storage::take_pending_location;
use crate::oidc_core::token_manager::TokenManager;
use crate::oidc_core::types::{OidcError, User};

/// Called with the signed-in user.
pub type SuccessCallback = Arc<dyn Fn(&User) + Send + Sync>;
/// Called with the reason a callback failed.
pub type ErrorCallback = Arc<dyn Fn(&OidcError) + Send + Sync>;

/// Where the view is in its single activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackPhase {
    Mounted,
    Processing,
    Done,
}

/// Result of [`CallbackView::activate`].
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackOutcome {
    /// The response was accepted; `redirected_to` is the restored location, if any.
    SignedIn { user: User, redirected_to: Option<String> },
    /// The response was rejected and the error callback was told.
    Failed(OidcError),
    /// The view had already been activated; nothing happened.
    AlreadyActivated,
}

/// Finishes the redirect flow and sends the browser back to where it was.
pub struct CallbackView {
    manager: Arc<dyn TokenManager>,
    on_success: Option<SuccessCallback>,
    on_error: Option<ErrorCallback>,
    redirect_on_success: bool,
    children: Option<String>,
    phase: CallbackPhase,
}

impl CallbackView {
    /// Mounts the view. Configuration errors surface here, not at activation.
    pub fn new(config: OidcConfig, ctx: BrowserContext) -> Result<Self, OidcError> {
        let manager = create_token_manager(config, ctx)?;
        Ok(Self::with_token_manager(Arc::new(manager)))
    }

    /// Mounts the view over an existing token manager.
    pub fn with_token_manager(manager: Arc<dyn TokenManager>) -> Self {
        CallbackView {
            manager,
            on_success: None,
            on_error: None,
            redirect_on_success: true,
            children: None,
            phase: CallbackPhase::Mounted,
        }
    }

    pub fn on_success(mut self, callback: impl Fn(&User) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(callback));
        self
    }

    pub fn on_error(mut self, callback: impl Fn(&OidcError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }

    /// Whether a successful callback navigates to the pending location. Defaults to true.
    pub fn redirect_on_success(mut self, redirect: bool) -> Self {
        self.redirect_on_success = redirect;
        self
    }

    /// Placeholder content shown while the response is processed.
    pub fn children(mut self, content: impl Into<String>) -> Self {
        self.children = Some(content.into());
        self
    }

    pub fn render(&self) -> Option<&str> {
        self.children.as_deref()
    }

    pub fn phase(&self) -> CallbackPhase {
        self.phase
    }

    /// Processes the current URL as the provider's response. Runs once per mount;
    /// errors go to the error callback instead of the caller.
    pub async fn activate(&mut self) -> CallbackOutcome {
        if self.phase != CallbackPhase::Mounted {
            warn!("callback view activated twice, ignoring");
            return CallbackOutcome::AlreadyActivated;
        }
        self.phase = CallbackPhase::Processing;

        let ctx = self.manager.context().clone();
        let url = ctx.navigator.current_url();
        let outcome = match self.manager.signin_redirect_callback(&url).await {
            Ok(user) => {
                let redirected_to = if self.redirect_on_success {
                    let target = take_pending_location(&*ctx.storage).unwrap_or_else(|| "/".to_string());
                    info!(location = %target, "resuming location after sign-in");
                    ctx.navigator.navigate(&target);
                    Some(target)
                } else {
                    None
                };
                if let Some(callback) = &self.on_success {
                    callback(&user);
                }
                CallbackOutcome::SignedIn { user, redirected_to }
            }
            Err(err) => {
                warn!(error = %err, "sign-in callback failed");
                if let Some(callback) = &self.on_error {
                    callback(&err);
                }
                CallbackOutcome::Failed(err)
            }
        };
        self.phase = CallbackPhase::Done;
        outcome
    }
}
