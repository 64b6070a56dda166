use tracing::info;

use crate::oidc_core::config::OidcConfig;
use crate::oidc_core::context::BrowserContext;
use crate::oidc_core::token_manager::{ImplicitTokenManager, TokenManager};
use crate::oidc_core::types::OidcError;

/// Builds the token manager for `config`. Configuration errors come straight back.
pub fn create_token_manager(config: OidcConfig, ctx: BrowserContext) -> Result<ImplicitTokenManager, OidcError> {
    ImplicitTokenManager::new(config, ctx)
}

/// Drops the local token record, then navigates to `redirect_to` if given.
pub fn logout<M: TokenManager + ?Sized>(manager: &M, redirect_to: Option<&str>) {
    manager.remove_user();
    info!("signed out locally");
    if let Some(target) = redirect_to {
        manager.context().navigator.navigate(target);
    }
}

/// Ends the session at the identity provider too. Returns the end-session URL
/// the browser was sent to.
pub fn logout_at_identity_service(config: OidcConfig, ctx: BrowserContext) -> Result<String, OidcError> {
    create_token_manager(config, ctx)?.signout_redirect()
}
