//! Durable key/value storage and the pending redirect location.

use std::sync::Arc;

use dashmap::DashMap;

use super::types::OidcError;

/// Key of the in-app location to resume after the provider round trip.
pub const PENDING_LOCATION_KEY: &str = "starberry_oidc/path";

/// Browser-style durable key/value storage.
pub trait WebStorage: Send + Sync + 'static {
    /// Reads a value.
    fn get_item(&self, key: &str) -> Option<String>;

    /// Writes a value, replacing any previous one.
    fn set_item(&self, key: &str, value: &str) -> Result<(), OidcError>;

    /// Deletes a value. Missing keys are not an error.
    fn remove_item(&self, key: &str);

    /// All keys currently stored.
    fn keys(&self) -> Vec<String>;
}

/// Process-local storage shared between clones.
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    items: Arc<DashMap<String, String>>,
}

impl InMemoryStorage {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl WebStorage for InMemoryStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.get(key).map(|entry| entry.value().clone())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), OidcError> {
        self.items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) {
        self.items.remove(key);
    }

    fn keys(&self) -> Vec<String> {
        self.items.iter().map(|entry| entry.key().clone()).collect()
    }
}

/// Records the location to come back to once the callback succeeds.
pub fn save_pending_location(storage: &dyn WebStorage, location: &str) -> Result<(), OidcError> {
    storage.set_item(PENDING_LOCATION_KEY, location)
}

/// Reads and clears the pending location.
pub fn take_pending_location(storage: &dyn WebStorage) -> Option<String> {
    let location = storage.get_item(PENDING_LOCATION_KEY);
    storage.remove_item(PENDING_LOCATION_KEY);
    location
}
