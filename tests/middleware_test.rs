mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use starberry_oidc::{
    create_oidc_middleware, BrowserContext, Dispatched, InMemoryStorage, LoggingMiddleware, Navigator, OidcError,
    OidcMiddleware, Store, TokenManager, User, WebStorage, PENDING_LOCATION_KEY,
};

use common::*;

#[derive(Debug, Clone, PartialEq)]
enum Action {
    Open(&'static str),
    UserExpired,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct AppState {
    log: Vec<Action>,
}

fn reducer(state: &AppState, action: &Action) -> AppState {
    let mut next = state.clone();
    next.log.push(action.clone());
    next
}

#[test]
fn predicate_false_passes_through_without_token() {
    let storage = InMemoryStorage::new();
    let (ctx, navigator) = browser(&storage, "https://app/dashboard");
    let store = Store::new(AppState::default(), reducer).with_middleware(
        OidcMiddleware::new(config(), ctx).should_validate(|_: &AppState, a: &Action| !matches!(a, Action::Open("public"))),
    );

    assert_eq!(store.dispatch(Action::Open("public")).unwrap(), Dispatched::Reduced);
    assert_eq!(store.get_state().log, vec![Action::Open("public")]);
    assert!(navigator.navigations().is_empty());
    assert!(storage.get_item(PENDING_LOCATION_KEY).is_none());
}

#[test]
fn live_token_never_navigates() {
    let storage = InMemoryStorage::new();
    put_user(&storage, &config(), &live_user());
    let (ctx, navigator) = browser(&storage, "https://app/dashboard");
    let store = Store::new(AppState::default(), reducer)
        .with_middleware(LoggingMiddleware)
        .with_middleware(OidcMiddleware::new(config(), ctx));

    for name in ["a", "b", "c"] {
        assert_eq!(store.dispatch(Action::Open(name)).unwrap(), Dispatched::Reduced);
    }
    assert_eq!(store.get_state().log.len(), 3);
    assert!(navigator.navigations().is_empty());
}

#[test]
fn missing_token_saves_location_and_redirects() {
    let storage = InMemoryStorage::new();
    let (ctx, navigator) = browser(&storage, "https://app/dashboard");
    let store = Store::new(AppState::default(), reducer).with_middleware(create_oidc_middleware(config(), ctx, None, None));

    let outcome = store.dispatch(Action::Open("reports")).unwrap();

    let Dispatched::Redirected(url) = outcome else {
        panic!("expected a redirect");
    };
    assert!(url.starts_with("https://idp/"));
    let params = query_of(&url);
    assert_eq!(params["client_id"], "app");
    assert_eq!(params["redirect_uri"], "https://x/cb");
    assert_eq!(params["response_type"], "id_token token");
    assert_eq!(params["scope"], "openid");
    assert!(params.contains_key("state"));
    assert!(params.contains_key("nonce"));

    assert_eq!(storage.get_item(PENDING_LOCATION_KEY).as_deref(), Some("/dashboard"));
    assert_eq!(navigator.navigations(), vec![url]);
    assert!(store.get_state().log.is_empty());
}

#[test]
fn pending_location_is_kept_byte_for_byte() {
    let storage = InMemoryStorage::new();
    let (ctx, _navigator) = browser(&storage, "https://app/reports/q%203?sort=desc&page=2#row-17");
    let store = Store::new(AppState::default(), reducer).with_middleware(OidcMiddleware::new(config(), ctx));

    store.dispatch(Action::Open("reports")).unwrap();
    assert_eq!(
        storage.get_item(PENDING_LOCATION_KEY).as_deref(),
        Some("/reports/q%203?sort=desc&page=2#row-17")
    );
}

#[test]
fn expired_token_emits_notice_before_navigating() {
    let storage = InMemoryStorage::new();
    put_user(&storage, &config(), &expired_user());
    let (ctx, navigator) = browser(&storage, "https://app/dashboard");
    let store = Store::new(AppState::default(), reducer)
        .with_middleware(OidcMiddleware::new(config(), ctx).dispatch_on_invalid(Action::UserExpired));

    let navigations_at_notice = Arc::new(Mutex::new(None));
    let seen = navigations_at_notice.clone();
    let nav = navigator.clone();
    store.subscribe(move |state: &AppState| {
        if state.log.last() == Some(&Action::UserExpired) {
            *seen.lock() = Some(nav.navigations().len());
        }
    });

    let outcome = store.dispatch(Action::Open("settings")).unwrap();

    assert!(matches!(outcome, Dispatched::Redirected(_)));
    assert_eq!(store.get_state().log, vec![Action::UserExpired]);
    assert_eq!(*navigations_at_notice.lock(), Some(0));
    assert_eq!(navigator.navigations().len(), 1);
}

#[test]
fn far_past_expiry_still_redirects() {
    let storage = InMemoryStorage::new();
    put_user(&storage, &config(), &user_expiring_at(i64::MIN));
    let (ctx, navigator) = browser(&storage, "https://app/dashboard");
    let store = Store::new(AppState::default(), reducer).with_middleware(OidcMiddleware::new(config(), ctx));

    assert!(matches!(store.dispatch(Action::Open("a")).unwrap(), Dispatched::Redirected(_)));
    assert_eq!(navigator.navigations().len(), 1);
}

#[test]
fn back_to_back_dispatches_each_redirect() {
    let storage = InMemoryStorage::new();
    let (ctx, navigator) = browser(&storage, "https://app/dashboard");
    let store = Store::new(AppState::default(), reducer).with_middleware(OidcMiddleware::new(config(), ctx));

    store.dispatch(Action::Open("a")).unwrap();
    store.dispatch(Action::Open("b")).unwrap();
    assert_eq!(navigator.navigations().len(), 2);
}

#[test]
fn bad_configuration_fails_the_dispatch() {
    let storage = InMemoryStorage::new();
    let (ctx, navigator) = browser(&storage, "https://app/dashboard");
    let mut bad = config();
    bad.client_id.clear();
    let store = Store::new(AppState::default(), reducer).with_middleware(OidcMiddleware::new(bad, ctx));

    let err = store.dispatch(Action::Open("a")).unwrap_err();
    assert!(matches!(err, OidcError::Config(_)));
    assert!(navigator.navigations().is_empty());
    assert!(store.get_state().log.is_empty());
}

struct CountingManager {
    ctx: BrowserContext,
    checks: Arc<AtomicUsize>,
    expired: bool,
}

#[async_trait]
impl TokenManager for CountingManager {
    fn context(&self) -> &BrowserContext {
        &self.ctx
    }

    fn get_user(&self) -> Result<Option<User>, OidcError> {
        Ok(None)
    }

    fn is_expired(&self) -> Result<bool, OidcError> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        Ok(self.expired)
    }

    fn signin_redirect(&self) -> Result<String, OidcError> {
        self.ctx.navigator.navigate("https://idp/custom");
        Ok("https://idp/custom".into())
    }

    async fn signin_redirect_callback(&self, _url: &str) -> Result<User, OidcError> {
        Err(OidcError::State("unused".into()))
    }

    fn remove_user(&self) {}

    fn signout_redirect(&self) -> Result<String, OidcError> {
        Err(OidcError::Config("unused".into()))
    }
}

#[test]
fn injected_manager_is_reused_across_dispatches() {
    let storage = InMemoryStorage::new();
    let (ctx, navigator) = browser(&storage, "https://app/dashboard");
    let checks = Arc::new(AtomicUsize::new(0));
    let manager = Arc::new(CountingManager { ctx: ctx.clone(), checks: checks.clone(), expired: false });
    let store = Store::new(AppState::default(), reducer)
        .with_middleware(OidcMiddleware::new(config(), ctx).token_manager(manager));

    store.dispatch(Action::Open("a")).unwrap();
    store.dispatch(Action::Open("b")).unwrap();
    assert_eq!(checks.load(Ordering::SeqCst), 2);
    assert!(navigator.navigations().is_empty());
}

#[test]
fn storage_error_while_checking_propagates() {
    let storage = InMemoryStorage::new();
    storage.set_item(&config().user_store_key(), "{not json").unwrap();
    let (ctx, navigator) = browser(&storage, "https://app/dashboard");
    let store = Store::new(AppState::default(), reducer).with_middleware(OidcMiddleware::new(config(), ctx));

    assert!(matches!(store.dispatch(Action::Open("a")), Err(OidcError::Storage(_))));
    assert_eq!(navigator.current_location(), "/dashboard");
}
