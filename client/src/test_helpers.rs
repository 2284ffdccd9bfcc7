//! Scripted backend and navigators for store and guard tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use protocol::{AdminUser, AuthResponse, Credentials, SessionUser};
use tokio::sync::{Notify, oneshot};
use uuid::Uuid;

use crate::net::api::{ClientError, SessionBackend};
use crate::state::auth::AuthStore;
use crate::util::navigator::{MemoryNavigator, Navigator};

pub const ADMIN_EMAIL: &str = "admin@lifeos.test";

pub fn user(email: &str) -> SessionUser {
    SessionUser { id: Uuid::new_v4(), email: email.to_owned() }
}

pub fn rejected(status: u16, message: &str) -> ClientError {
    ClientError::Rejected { status, message: message.to_owned() }
}

pub fn signed_in(user: &SessionUser, message: &str) -> Result<AuthResponse, ClientError> {
    Ok(AuthResponse { message: message.to_owned(), user: Some(user.clone()) })
}

/// One scripted credential answer, optionally held until released.
pub struct Scripted {
    hold: Option<oneshot::Receiver<()>>,
    result: Result<AuthResponse, ClientError>,
}

impl Scripted {
    pub fn now(result: Result<AuthResponse, ClientError>) -> Self {
        Self { hold: None, result }
    }

    /// Answer once the returned sender fires (or is dropped).
    pub fn held(result: Result<AuthResponse, ClientError>) -> (Self, oneshot::Sender<()>) {
        let (tx, rx) = oneshot::channel();
        (Self { hold: Some(rx), result }, tx)
    }
}

#[derive(Default)]
pub struct MockBackend {
    session: Mutex<Option<Result<Option<SessionUser>, ClientError>>>,
    credentials: Mutex<VecDeque<Scripted>>,
    users: Mutex<Option<Vec<AdminUser>>>,
    logout_fails: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn set_session(&self, result: Result<Option<SessionUser>, ClientError>) {
        *self.session.lock().unwrap() = Some(result);
    }

    /// Queue an answer for the next login or signup.
    pub fn push(&self, scripted: Scripted) {
        self.credentials.lock().unwrap().push_back(scripted);
    }

    pub fn set_users(&self, users: Vec<AdminUser>) {
        *self.users.lock().unwrap() = Some(users);
    }

    pub fn fail_logout(&self) {
        self.logout_fails.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    async fn answer(&self, call: &str, credentials: &Credentials) -> Result<AuthResponse, ClientError> {
        self.record(format!("{call} {}", credentials.email));
        let next = self.credentials.lock().unwrap().pop_front();
        let Some(Scripted { hold, result }) = next else {
            return Err(rejected(401, "Invalid email or password"));
        };
        if let Some(hold) = hold {
            let _ = hold.await;
        }
        result
    }
}

#[async_trait]
impl SessionBackend for MockBackend {
    async fn session(&self) -> Result<Option<SessionUser>, ClientError> {
        self.record("session");
        self.session.lock().unwrap().take().unwrap_or(Ok(None))
    }

    async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ClientError> {
        self.answer("login", credentials).await
    }

    async fn signup(&self, credentials: &Credentials) -> Result<AuthResponse, ClientError> {
        self.answer("signup", credentials).await
    }

    async fn logout(&self) -> Result<(), ClientError> {
        self.record("logout");
        if self.logout_fails.load(Ordering::SeqCst) {
            return Err(rejected(500, "Internal server error"));
        }
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<AdminUser>, ClientError> {
        self.record("list_users");
        self.users.lock().unwrap().clone().ok_or_else(|| rejected(403, "Unauthorized"))
    }
}

/// Navigator whose views only become ready when the test says so.
pub struct GatedNavigator {
    pub inner: MemoryNavigator,
    pub ready: Notify,
}

impl GatedNavigator {
    pub fn new(initial: &str) -> Self {
        Self { inner: MemoryNavigator::new(initial), ready: Notify::new() }
    }
}

#[async_trait]
impl Navigator for GatedNavigator {
    fn current_path(&self) -> String {
        self.inner.current_path()
    }

    async fn navigate(&self, path: &str) {
        self.inner.visit(path);
        self.ready.notified().await;
    }
}

pub struct Harness {
    pub backend: Arc<MockBackend>,
    pub navigator: Arc<MemoryNavigator>,
    pub store: Arc<AuthStore>,
}

/// Store over a mock backend with the navigator at `path`.
pub fn harness(path: &str) -> Harness {
    let backend = Arc::new(MockBackend::default());
    let navigator = Arc::new(MemoryNavigator::new(path));
    let store = Arc::new(AuthStore::new(backend.clone(), navigator.clone()).with_admin_email(ADMIN_EMAIL));
    Harness { backend, navigator, store }
}

/// Yield until the backend has seen `n` calls.
pub async fn wait_for_calls(backend: &MockBackend, n: usize) {
    while backend.calls().len() < n {
        tokio::task::yield_now().await;
    }
}
