//! A small unidirectional state store with a middleware chain.
//!
//! Every `dispatch` walks the middleware chain in registration order; the end
//! of the chain applies the reducer and notifies subscribers.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::debug;

use crate::oidc_core::types::OidcError;

/// What happened to a dispatched action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    /// The reducer ran.
    Reduced,
    /// A middleware handed control to the identity provider at this URL.
    Redirected(String),
}

type Reducer<S, A> = Box<dyn Fn(&S, &A) -> S + Send + Sync>;
type Listener<S> = Arc<dyn Fn(&S) + Send + Sync>;

/// A link in the dispatch chain.
pub trait Middleware<S, A>: Send + Sync + 'static {
    /// Handles `action`. Call `next.run` to continue down the chain, or
    /// `store.dispatch` to restart from the top.
    fn handle(&self, store: &Store<S, A>, action: A, next: Next<'_, S, A>) -> Result<Dispatched, OidcError>;
}

/// The remainder of the chain after the current middleware.
pub struct Next<'a, S, A> {
    store: &'a Store<S, A>,
    index: usize,
}

impl<S, A> Next<'_, S, A>
where
    S: Clone + Send + Sync + 'static,
    A: Send + 'static,
{
    /// Passes `action` to the following middleware, or to the reducer.
    pub fn run(&self, action: A) -> Result<Dispatched, OidcError> {
        self.store.run_from(self.index, action)
    }
}

/// Holds the application state.
pub struct Store<S, A> {
    state: RwLock<S>,
    reducer: Reducer<S, A>,
    middlewares: Vec<Box<dyn Middleware<S, A>>>,
    listeners: Mutex<Vec<Listener<S>>>,
}

impl<S, A> Store<S, A>
where
    S: Clone + Send + Sync + 'static,
    A: Send + 'static,
{
    /// Creates a store with no middleware.
    pub fn new(initial: S, reducer: impl Fn(&S, &A) -> S + Send + Sync + 'static) -> Self {
        Store {
            state: RwLock::new(initial),
            reducer: Box::new(reducer),
            middlewares: Vec::new(),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Appends a middleware; earlier ones see actions first.
    pub fn with_middleware(mut self, middleware: impl Middleware<S, A>) -> Self {
        self.middlewares.push(Box::new(middleware));
        self
    }

    /// Sends `action` through the whole chain.
    pub fn dispatch(&self, action: A) -> Result<Dispatched, OidcError> {
        self.run_from(0, action)
    }

    /// A snapshot of the current state.
    pub fn get_state(&self) -> S {
        self.state.read().clone()
    }

    /// Reads the state in place. `f` must not dispatch.
    pub fn with_state<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        let state = self.state.read();
        f(&*state)
    }

    /// Calls `listener` with the new state after every reduction.
    pub fn subscribe(&self, listener: impl Fn(&S) + Send + Sync + 'static) {
        self.listeners.lock().push(Arc::new(listener));
    }

    fn run_from(&self, index: usize, action: A) -> Result<Dispatched, OidcError> {
        match self.middlewares.get(index) {
            Some(middleware) => middleware.handle(self, action, Next { store: self, index: index + 1 }),
            None => {
                self.reduce(&action);
                Ok(Dispatched::Reduced)
            }
        }
    }

    fn reduce(&self, action: &A) {
        let snapshot = {
            let mut state = self.state.write();
            let next = (self.reducer)(&*state, action);
            *state = next;
            state.clone()
        };
        let listeners = self.listeners.lock().clone();
        for listener in listeners {
            listener(&snapshot);
        }
    }
}

/// Logs every action that passes through.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingMiddleware;

impl<S, A> Middleware<S, A> for LoggingMiddleware
where
    S: Clone + Send + Sync + 'static,
    A: fmt::Debug + Send + 'static,
{
    fn handle(&self, _store: &Store<S, A>, action: A, next: Next<'_, S, A>) -> Result<Dispatched, OidcError> {
        debug!(action = ?action, "dispatching");
        let outcome = next.run(action);
        debug!(outcome = ?outcome, "dispatched");
        outcome
    }
}
