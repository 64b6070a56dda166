//! Browser location and full-page navigation.

use std::sync::Arc;

use parking_lot::Mutex;
use url::Url;

/// Access to the browser location.
pub trait Navigator: Send + Sync + 'static {
    /// Absolute URL of the current page.
    fn current_url(&self) -> String;

    /// Full-page navigation. Nothing after this call survives in a real browser.
    fn navigate(&self, url: &str);

    /// The in-app location: path, query and fragment of the current URL.
    fn current_location(&self) -> String {
        let href = self.current_url();
        match Url::parse(&href) {
            Ok(url) => in_app_location(&url),
            Err(_) => href,
        }
    }
}

fn in_app_location(url: &Url) -> String {
    let mut location = url.path().to_string();
    if let Some(query) = url.query() {
        location.push('?');
        location.push_str(query);
    }
    if let Some(fragment) = url.fragment() {
        location.push('#');
        location.push_str(fragment);
    }
    location
}

/// Headless navigator that records every navigation.
#[derive(Clone)]
pub struct MemoryNavigator {
    current: Arc<Mutex<String>>,
    history: Arc<Mutex<Vec<String>>>,
}

impl MemoryNavigator {
    /// Starts at `href`, which should be absolute.
    pub fn new(href: impl Into<String>) -> Self {
        MemoryNavigator {
            current: Arc::new(Mutex::new(href.into())),
            history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Targets passed to `navigate`, oldest first, exactly as given.
    pub fn navigations(&self) -> Vec<String> {
        self.history.lock().clone()
    }

    /// Most recent navigation target.
    pub fn last_navigation(&self) -> Option<String> {
        self.history.lock().last().cloned()
    }
}

impl Navigator for MemoryNavigator {
    fn current_url(&self) -> String {
        self.current.lock().clone()
    }

    fn navigate(&self, url: &str) {
        let mut current = self.current.lock();
        let next = Url::parse(&current)
            .and_then(|base| base.join(url))
            .map(String::from)
            .unwrap_or_else(|_| url.to_string());
        *current = next;
        self.history.lock().push(url.to_string());
    }
}
