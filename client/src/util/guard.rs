//! Client-side route guard.
//!
//! SYSTEM CONTEXT
//! ==============
//! Views should never show the login form to a signed-in user or a
//! protected page to a signed-out one. The driver watches the auth snapshot
//! and, whenever it settles, applies the shared route policy to the current
//! location. Snapshots mid-operation are ignored; the store navigates for
//! those itself.

#[cfg(test)]
#[path = "guard_test.rs"]
mod guard_test;

use std::sync::Arc;

use protocol::routes::redirect_for;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::state::auth::{AuthSnapshot, AuthStore};
use crate::util::navigator::Navigator;

/// Redirect target for `snapshot` at `path`, or `None` to stay.
#[must_use]
pub fn guard_redirect(snapshot: &AuthSnapshot, path: &str) -> Option<&'static str> {
    if !snapshot.is_settled() {
        return None;
    }
    redirect_for(path, snapshot.is_authenticated())
}

/// Apply the policy once. Returns where it navigated, if anywhere.
pub async fn enforce(snapshot: &AuthSnapshot, navigator: &dyn Navigator) -> Option<&'static str> {
    let path = navigator.current_path();
    let target = guard_redirect(snapshot, &path)?;
    tracing::debug!(%path, %target, "route guard redirect");
    navigator.navigate(target).await;
    Some(target)
}

/// Enforce the policy on every snapshot until the store is dropped.
pub async fn run_route_guard(mut snapshots: watch::Receiver<AuthSnapshot>, navigator: Arc<dyn Navigator>) {
    loop {
        let snapshot = snapshots.borrow_and_update().clone();
        enforce(&snapshot, navigator.as_ref()).await;
        if snapshots.changed().await.is_err() {
            break;
        }
    }
}

/// Spawn [`run_route_guard`] for `store` on the current runtime.
pub fn spawn_route_guard(store: &AuthStore) -> JoinHandle<()> {
    tokio::spawn(run_route_guard(store.subscribe(), store.navigator()))
}
