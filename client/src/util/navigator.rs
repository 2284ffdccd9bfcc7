//! Navigation seam between the auth core and whatever renders views.

#[cfg(test)]
#[path = "navigator_test.rs"]
mod navigator_test;

use std::sync::Mutex;

use async_trait::async_trait;
use protocol::routes::HOME_ROUTE;

/// A router the auth store can drive.
#[async_trait]
pub trait Navigator: Send + Sync {
    /// Path of the view currently shown.
    fn current_path(&self) -> String;

    /// Move to `path`. Resolves once the new view is ready to be shown, which
    /// is what ends a transition.
    async fn navigate(&self, path: &str);
}

/// Navigator that only tracks a location. Ready as soon as the path changes.
pub struct MemoryNavigator {
    history: Mutex<Vec<String>>,
}

impl Default for MemoryNavigator {
    fn default() -> Self {
        Self::new(HOME_ROUTE)
    }
}

impl MemoryNavigator {
    #[must_use]
    pub fn new(initial: &str) -> Self {
        Self { history: Mutex::new(vec![initial.to_owned()]) }
    }

    /// Every location visited, starting with the initial one.
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.history.lock().map(|h| h.clone()).unwrap_or_default()
    }

    /// Change location directly, as when a user types a URL.
    pub fn visit(&self, path: &str) {
        if let Ok(mut history) = self.history.lock() {
            history.push(path.to_owned());
        }
    }
}

#[async_trait]
impl Navigator for MemoryNavigator {
    fn current_path(&self) -> String {
        self.history
            .lock()
            .ok()
            .and_then(|h| h.last().cloned())
            .unwrap_or_else(|| HOME_ROUTE.to_owned())
    }

    async fn navigate(&self, path: &str) {
        tracing::debug!(%path, "navigate");
        self.visit(path);
    }
}
