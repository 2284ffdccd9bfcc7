//! Auth-session state for the current user.
//!
//! SYSTEM CONTEXT
//! ==============
//! Front ends subscribe to one snapshot channel instead of being mutated,
//! and read toasts from a separate notice channel. The route guard driver in
//! `util::guard` watches the same snapshot to keep the location in line with
//! the route policy.
//!
//! CONCURRENCY
//! ===========
//! Every operation takes a new epoch when it starts. Epochs are bumped and
//! checked while the snapshot channel's lock is held, so a publish from an
//! older operation that lands after a newer one has started is dropped.
//! The last operation started is the one whose result sticks.
//!
//! Requests that change the session cookie (login, signup, logout) run one
//! at a time in start order. A sign-in whose answer arrives after a newer
//! operation began logs out again before releasing its turn, so the cookie
//! jar always agrees with the published state.
//!
//! A sign-in or sign-out ends in a transition: the gate opens, the navigator
//! moves to the next view, and the settled state is published once that view
//! reports ready.

#[cfg(test)]
#[path = "auth_test.rs"]
mod auth_test;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use protocol::routes::{HOME_ROUTE, LOGIN_ROUTE, RouteKind, classify};
use protocol::{AdminUser, AuthResponse, Credentials, SessionUser};
use tokio::sync::{Mutex, broadcast, watch};

use crate::net::api::SessionBackend;
use crate::state::transition::{TransitionGate, TransitionTicket};
use crate::util::navigator::Navigator;

const NOTICE_CAPACITY: usize = 16;
const SUPERSEDED_MESSAGE: &str = "Superseded by a newer sign-in or sign-out.";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuthState {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated,
    Transitioning,
}

/// What views render from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthSnapshot {
    pub state: AuthState,
    pub user: Option<SessionUser>,
    /// True until the first session check finishes, and during later checks.
    pub loading: bool,
}

impl Default for AuthSnapshot {
    fn default() -> Self {
        Self { state: AuthState::Unauthenticated, user: None, loading: true }
    }
}

impl AuthSnapshot {
    /// Neither loading nor mid-operation.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !self.loading && matches!(self.state, AuthState::Authenticated | AuthState::Unauthenticated)
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state == AuthState::Authenticated && self.user.is_some()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// A toast for the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub description: String,
}

impl Notice {
    fn new(level: NoticeLevel, title: &str, description: impl Into<String>) -> Self {
        Self { level, title: title.to_owned(), description: description.into() }
    }
}

/// Result of a sign-in or sign-up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthOutcome {
    pub success: bool,
    pub message: String,
    pub user: Option<SessionUser>,
}

impl AuthOutcome {
    fn failed(message: String) -> Self {
        Self { success: false, message, user: None }
    }
}

#[derive(Clone, Copy, Debug)]
enum CredentialFlow {
    SignIn,
    SignUp,
}

impl CredentialFlow {
    fn success_title(self) -> &'static str {
        match self {
            Self::SignIn => "Welcome back!",
            Self::SignUp => "Account created",
        }
    }

    fn failure_title(self) -> &'static str {
        match self {
            Self::SignIn => "Sign in failed",
            Self::SignUp => "Sign up failed",
        }
    }
}

// =============================================================================
// STORE
// =============================================================================

pub struct AuthStore {
    backend: Arc<dyn SessionBackend>,
    navigator: Arc<dyn Navigator>,
    admin_email: Option<String>,
    snapshot: watch::Sender<AuthSnapshot>,
    notices: broadcast::Sender<Notice>,
    /// Epoch of the most recently started operation. Only touched under the
    /// snapshot channel's lock.
    epoch: AtomicU64,
    /// Serializes requests that set or clear the session cookie, so cookies
    /// land in the order operations started.
    session_writes: Mutex<()>,
    gate: TransitionGate,
}

impl AuthStore {
    #[must_use]
    pub fn new(backend: Arc<dyn SessionBackend>, navigator: Arc<dyn Navigator>) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            backend,
            navigator,
            admin_email: None,
            snapshot: watch::Sender::new(AuthSnapshot::default()),
            notices,
            epoch: AtomicU64::new(0),
            session_writes: Mutex::new(()),
            gate: TransitionGate::new(),
        }
    }

    /// Email whose owner may see the admin views.
    #[must_use]
    pub fn with_admin_email(mut self, email: impl Into<String>) -> Self {
        self.admin_email = Some(email.into());
        self
    }

    #[must_use]
    pub fn snapshot(&self) -> AuthSnapshot {
        self.snapshot.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthSnapshot> {
        self.snapshot.subscribe()
    }

    #[must_use]
    pub fn notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    #[must_use]
    pub fn transition_gate(&self) -> &TransitionGate {
        &self.gate
    }

    #[must_use]
    pub fn navigator(&self) -> Arc<dyn Navigator> {
        Arc::clone(&self.navigator)
    }

    #[must_use]
    pub fn user(&self) -> Option<SessionUser> {
        self.snapshot.borrow().user.clone()
    }

    /// Whether the signed-in user's email matches the admin email, ignoring
    /// case.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        let Some(admin) = self.admin_email.as_deref() else {
            return false;
        };
        self.snapshot.borrow().user.as_ref().is_some_and(|user| user.email.eq_ignore_ascii_case(admin))
    }

    // -------------------------------------------------------------------------
    // epochs
    // -------------------------------------------------------------------------

    /// Start an operation: take a new epoch and apply `update`.
    fn begin(&self, update: impl FnOnce(&mut AuthSnapshot)) -> u64 {
        let mut epoch = 0;
        self.snapshot.send_modify(|snapshot| {
            epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
            update(snapshot);
        });
        epoch
    }

    /// Apply `update` if `epoch` is still the latest. Returns whether it was.
    fn publish(&self, epoch: u64, update: impl FnOnce(&mut AuthSnapshot)) -> bool {
        let published = self.snapshot.send_if_modified(|snapshot| {
            if self.epoch.load(Ordering::SeqCst) != epoch {
                return false;
            }
            update(snapshot);
            true
        });
        if !published {
            tracing::debug!(epoch, "superseded auth update dropped");
        }
        published
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }

    fn notify(&self, notice: Notice) {
        // No subscribers is fine.
        let _ = self.notices.send(notice);
    }

    /// Move to `target` under `ticket` and publish `settled` once the view
    /// there is ready.
    async fn transition_to(&self, epoch: u64, ticket: TransitionTicket, target: &str, settled: AuthState) {
        if self.is_current(epoch) {
            self.navigator.navigate(target).await;
        }
        self.publish(epoch, |snapshot| {
            snapshot.state = settled;
            snapshot.loading = false;
        });
        ticket.complete();
    }

    // -------------------------------------------------------------------------
    // operations
    // -------------------------------------------------------------------------

    /// Ask the server who is signed in and reconcile location with the
    /// answer. Any failure reads as signed out; nothing is retried.
    pub async fn check_session(&self) -> Option<SessionUser> {
        let epoch = self.begin(|snapshot| {
            snapshot.state = AuthState::Authenticating;
            snapshot.loading = true;
        });

        let user = match self.backend.session().await {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(error = %e, "session check failed");
                None
            }
        };

        let path = self.navigator.current_path();
        match user {
            Some(user) => {
                let on_auth_page = classify(&path) == RouteKind::AuthPage;
                let state = if on_auth_page { AuthState::Transitioning } else { AuthState::Authenticated };
                let published = self.publish(epoch, |snapshot| {
                    snapshot.user = Some(user.clone());
                    snapshot.state = state;
                    snapshot.loading = false;
                });
                if published && on_auth_page {
                    let ticket = self.gate.begin();
                    self.transition_to(epoch, ticket, HOME_ROUTE, AuthState::Authenticated).await;
                }
                Some(user)
            }
            None => {
                if classify(&path) == RouteKind::ProtectedPage && self.is_current(epoch) {
                    self.navigator.navigate(LOGIN_ROUTE).await;
                }
                self.publish(epoch, |snapshot| {
                    snapshot.user = None;
                    snapshot.state = AuthState::Unauthenticated;
                    snapshot.loading = false;
                });
                None
            }
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthOutcome {
        self.authenticate(CredentialFlow::SignIn, Credentials::new(email, password)).await
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> AuthOutcome {
        self.authenticate(CredentialFlow::SignUp, Credentials::new(email, password)).await
    }

    async fn authenticate(&self, flow: CredentialFlow, credentials: Credentials) -> AuthOutcome {
        let epoch = self.begin(|snapshot| snapshot.state = AuthState::Authenticating);
        let serial = self.session_writes.lock().await;

        let result = match flow {
            CredentialFlow::SignIn => self.backend.login(&credentials).await,
            CredentialFlow::SignUp => self.backend.signup(&credentials).await,
        };

        match result {
            Ok(AuthResponse { message, user: Some(user) }) => {
                let published = self.publish(epoch, |snapshot| {
                    snapshot.user = Some(user.clone());
                    snapshot.state = AuthState::Transitioning;
                    snapshot.loading = false;
                });
                if !published {
                    // The cookie from this answer must not outlive the newer operation.
                    self.drop_server_session("superseded sign-in").await;
                    return AuthOutcome::failed(SUPERSEDED_MESSAGE.to_owned());
                }
                drop(serial);
                tracing::info!(user_id = %user.id, ?flow, "signed in");
                self.notify(Notice::new(NoticeLevel::Success, flow.success_title(), message.clone()));
                let ticket = self.gate.begin();
                self.transition_to(epoch, ticket, HOME_ROUTE, AuthState::Authenticated).await;
                AuthOutcome { success: true, message, user: Some(user) }
            }
            // Account created but no session issued: the user has to log in.
            Ok(AuthResponse { message, user: None }) => {
                if self.settle_signed_out(epoch).await {
                    self.notify(Notice::new(NoticeLevel::Info, flow.success_title(), message.clone()));
                }
                AuthOutcome::failed(message)
            }
            Err(e) => {
                tracing::debug!(error = %e, ?flow, "credential check failed");
                let message = e.user_message();
                if self.settle_signed_out(epoch).await {
                    self.notify(Notice::new(NoticeLevel::Error, flow.failure_title(), message.clone()));
                }
                AuthOutcome::failed(message)
            }
        }
    }

    /// Publish signed-out for `epoch`. A session the snapshot still held is
    /// ended on the server as well. Callers hold `session_writes`.
    async fn settle_signed_out(&self, epoch: u64) -> bool {
        let mut had_user = false;
        let published = self.publish(epoch, |snapshot| {
            had_user = snapshot.user.take().is_some();
            snapshot.state = AuthState::Unauthenticated;
            snapshot.loading = false;
        });
        if published && had_user {
            self.drop_server_session("failed credential check").await;
        }
        published
    }

    async fn drop_server_session(&self, reason: &'static str) {
        tracing::debug!(reason, "dropping server session");
        if let Err(e) = self.backend.logout().await {
            tracing::warn!(error = %e, reason, "dropping server session failed");
        }
    }

    /// Sign out and move to the login view. Local state is cleared even when
    /// the request fails; the next session check reconciles with the server.
    pub async fn sign_out(&self) {
        let epoch = self.begin(|snapshot| snapshot.state = AuthState::Transitioning);
        let ticket = self.gate.begin();

        let logout = {
            let _serial = self.session_writes.lock().await;
            self.backend.logout().await
        };
        if let Err(e) = logout {
            tracing::warn!(error = %e, "logout request failed; clearing local session anyway");
        }

        let published = self.publish(epoch, |snapshot| snapshot.user = None);
        if !published {
            return;
        }
        self.notify(Notice::new(NoticeLevel::Success, "Signed out", "You have been signed out."));
        self.transition_to(epoch, ticket, LOGIN_ROUTE, AuthState::Unauthenticated).await;
    }

    /// Every account, for the admin view. `None` on any failure.
    pub async fn list_users(&self) -> Option<Vec<AdminUser>> {
        match self.backend.list_users().await {
            Ok(users) => Some(users),
            Err(e) => {
                tracing::warn!(error = %e, status = ?e.status(), "listing users failed");
                None
            }
        }
    }
}
