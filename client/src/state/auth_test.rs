use std::sync::Arc;

use super::*;
use crate::test_helpers::{
    ADMIN_EMAIL, GatedNavigator, Harness, MockBackend, Scripted, harness, rejected, signed_in, user, wait_for_calls,
};

// =============================================================================
// snapshot basics
// =============================================================================

#[test]
fn starts_loading_and_signed_out() {
    let h = harness("/");
    let snapshot = h.store.snapshot();
    assert_eq!(snapshot.state, AuthState::Unauthenticated);
    assert!(snapshot.loading);
    assert!(!snapshot.is_settled());
    assert!(h.store.user().is_none());
}

#[test]
fn settled_requires_terminal_state() {
    let mut snapshot = AuthSnapshot { state: AuthState::Transitioning, user: None, loading: false };
    assert!(!snapshot.is_settled());
    snapshot.state = AuthState::Authenticating;
    assert!(!snapshot.is_settled());
    snapshot.state = AuthState::Authenticated;
    assert!(snapshot.is_settled());
    assert!(!snapshot.is_authenticated());
}

// =============================================================================
// check_session
// =============================================================================

#[tokio::test]
async fn check_session_with_user_authenticates_in_place() {
    let h = harness("/goals");
    let alice = user("alice@example.com");
    h.backend.set_session(Ok(Some(alice.clone())));

    assert_eq!(h.store.check_session().await, Some(alice.clone()));

    let snapshot = h.store.snapshot();
    assert_eq!(snapshot.state, AuthState::Authenticated);
    assert_eq!(snapshot.user, Some(alice));
    assert!(!snapshot.loading);
    assert_eq!(h.navigator.history(), vec!["/goals"]);
}

#[tokio::test]
async fn check_session_on_auth_page_moves_home() {
    let h = harness("/login");
    h.backend.set_session(Ok(Some(user("alice@example.com"))));

    h.store.check_session().await;

    assert_eq!(h.navigator.current_path(), "/");
    assert_eq!(h.store.snapshot().state, AuthState::Authenticated);
    assert!(!h.store.transition_gate().is_visible());
}

#[tokio::test]
async fn check_session_without_user_leaves_protected_page() {
    let h = harness("/goals");
    h.backend.set_session(Ok(None));

    assert_eq!(h.store.check_session().await, None);

    assert_eq!(h.navigator.history(), vec!["/goals", "/login"]);
    let snapshot = h.store.snapshot();
    assert_eq!(snapshot.state, AuthState::Unauthenticated);
    assert!(snapshot.is_settled());
}

#[tokio::test]
async fn check_session_without_user_stays_on_public_page() {
    let h = harness("/signup");
    h.backend.set_session(Ok(None));

    h.store.check_session().await;

    assert_eq!(h.navigator.history(), vec!["/signup"]);
}

#[tokio::test]
async fn check_session_error_clears_previous_user() {
    let h = harness("/");
    h.backend.set_session(Ok(Some(user("alice@example.com"))));
    h.store.check_session().await;
    assert!(h.store.snapshot().is_authenticated());

    h.backend.set_session(Err(rejected(500, "Internal server error")));
    h.store.check_session().await;

    let snapshot = h.store.snapshot();
    assert_eq!(snapshot.state, AuthState::Unauthenticated);
    assert!(snapshot.user.is_none());
    assert_eq!(h.navigator.current_path(), "/login");
}

// =============================================================================
// sign_in / sign_up
// =============================================================================

#[tokio::test]
async fn sign_in_success_transitions_home() {
    let h = harness("/login");
    let alice = user("alice@example.com");
    h.backend.push(Scripted::now(signed_in(&alice, "Login successful!")));
    let mut notices = h.store.notices();

    let outcome = h.store.sign_in("alice@example.com", "secret1").await;

    assert!(outcome.success);
    assert_eq!(outcome.user, Some(alice.clone()));
    assert_eq!(outcome.message, "Login successful!");
    assert_eq!(h.navigator.history(), vec!["/login", "/"]);
    let snapshot = h.store.snapshot();
    assert_eq!(snapshot.state, AuthState::Authenticated);
    assert_eq!(snapshot.user, Some(alice));
    assert!(!h.store.transition_gate().is_visible());

    let notice = notices.try_recv().unwrap();
    assert_eq!(notice.level, NoticeLevel::Success);
    assert_eq!(notice.description, "Login successful!");
}

#[tokio::test]
async fn sign_in_waits_for_next_view_before_settling() {
    let backend = Arc::new(MockBackend::default());
    let navigator = Arc::new(GatedNavigator::new("/login"));
    let store = Arc::new(AuthStore::new(backend.clone(), navigator.clone()));
    backend.push(Scripted::now(signed_in(&user("alice@example.com"), "Login successful!")));

    let task = {
        let store = Arc::clone(&store);
        tokio::spawn(async move { store.sign_in("alice@example.com", "secret1").await })
    };

    let mut rx = store.subscribe();
    rx.wait_for(|s| s.state == AuthState::Transitioning).await.unwrap();
    assert!(store.transition_gate().is_visible());
    while navigator.current_path() != "/" {
        tokio::task::yield_now().await;
    }
    assert_eq!(store.snapshot().state, AuthState::Transitioning);

    navigator.ready.notify_one();
    assert!(task.await.unwrap().success);
    assert_eq!(store.snapshot().state, AuthState::Authenticated);
    assert!(!store.transition_gate().is_visible());
}

#[tokio::test]
async fn sign_in_wrong_password_reports_error() {
    let h = harness("/login");
    h.backend.push(Scripted::now(Err(rejected(401, "Invalid email or password"))));
    let mut notices = h.store.notices();

    let outcome = h.store.sign_in("alice@example.com", "wrong").await;

    assert!(!outcome.success);
    assert_eq!(outcome.message, "Invalid email or password");
    assert!(outcome.user.is_none());
    let snapshot = h.store.snapshot();
    assert_eq!(snapshot.state, AuthState::Unauthenticated);
    assert!(snapshot.user.is_none());
    assert_eq!(h.navigator.history(), vec!["/login"]);

    let notice = notices.try_recv().unwrap();
    assert_eq!(notice.level, NoticeLevel::Error);
    assert_eq!(notice.title, "Sign in failed");
    assert_eq!(notice.description, "Invalid email or password");
}

#[tokio::test]
async fn sign_up_conflict_reports_server_message() {
    let h = harness("/signup");
    h.backend.push(Scripted::now(Err(rejected(409, "User with this email already exists"))));

    let outcome = h.store.sign_up("taken@example.com", "secret1").await;

    assert!(!outcome.success);
    assert_eq!(outcome.message, "User with this email already exists");
    assert_eq!(h.backend.calls(), vec!["signup taken@example.com"]);
}

#[tokio::test]
async fn sign_up_without_session_asks_to_log_in() {
    let h = harness("/signup");
    let message = "Account created but automatic login failed. Please try logging in.";
    h.backend.push(Scripted::now(Ok(AuthResponse { message: message.into(), user: None })));
    let mut notices = h.store.notices();

    let outcome = h.store.sign_up("new@example.com", "secret1").await;

    assert!(!outcome.success);
    assert_eq!(h.store.snapshot().state, AuthState::Unauthenticated);
    assert_eq!(notices.try_recv().unwrap().level, NoticeLevel::Info);
}

// =============================================================================
// sign_out
// =============================================================================

#[tokio::test]
async fn sign_out_clears_user_and_moves_to_login() {
    let h = harness("/");
    h.backend.push(Scripted::now(signed_in(&user("alice@example.com"), "Login successful!")));
    h.store.sign_in("alice@example.com", "secret1").await;

    h.store.sign_out().await;

    let snapshot = h.store.snapshot();
    assert_eq!(snapshot.state, AuthState::Unauthenticated);
    assert!(snapshot.user.is_none());
    assert_eq!(h.navigator.current_path(), "/login");
    assert!(h.backend.calls().contains(&"logout".to_owned()));
    assert!(!h.store.transition_gate().is_visible());
}

#[tokio::test]
async fn sign_out_clears_locally_when_request_fails() {
    let h = harness("/");
    h.backend.set_session(Ok(Some(user("alice@example.com"))));
    h.store.check_session().await;
    h.backend.fail_logout();

    h.store.sign_out().await;

    assert!(h.store.user().is_none());
    assert_eq!(h.store.snapshot().state, AuthState::Unauthenticated);
}

// =============================================================================
// overlapping operations
// =============================================================================

/// Spawn `sign_in` on the store and return once it has taken its epoch.
async fn start_sign_in(h: &Harness, password: &'static str) -> tokio::task::JoinHandle<AuthOutcome> {
    let mut rx = h.store.subscribe();
    let _ = rx.borrow_and_update();
    let store = Arc::clone(&h.store);
    let task = tokio::spawn(async move { store.sign_in("alice@example.com", password).await });
    rx.changed().await.unwrap();
    task
}

#[tokio::test]
async fn later_failure_wins_over_slow_success() {
    let h = harness("/login");
    let (slow, release) = Scripted::held(signed_in(&user("alice@example.com"), "Login successful!"));
    h.backend.push(slow);
    h.backend.push(Scripted::now(Err(rejected(401, "Invalid email or password"))));

    let first = start_sign_in(&h, "secret1").await;
    wait_for_calls(&h.backend, 1).await;
    let second = start_sign_in(&h, "wrong").await;

    release.send(()).unwrap();
    assert!(!first.await.unwrap().success);
    assert!(!second.await.unwrap().success);

    let snapshot = h.store.snapshot();
    assert_eq!(snapshot.state, AuthState::Unauthenticated);
    assert!(snapshot.user.is_none());
    assert_eq!(h.navigator.history(), vec!["/login"]);
    assert_eq!(
        h.backend.calls(),
        vec!["login alice@example.com", "logout", "login alice@example.com"]
    );
}

#[tokio::test]
async fn later_success_wins_over_slow_failure() {
    let h = harness("/login");
    let alice = user("alice@example.com");
    let (slow, release) = Scripted::held(Err(rejected(401, "Invalid email or password")));
    h.backend.push(slow);
    h.backend.push(Scripted::now(signed_in(&alice, "Login successful!")));

    let first = start_sign_in(&h, "wrong").await;
    wait_for_calls(&h.backend, 1).await;
    let second = start_sign_in(&h, "secret1").await;

    release.send(()).unwrap();
    first.await.unwrap();
    assert!(second.await.unwrap().success);

    let snapshot = h.store.snapshot();
    assert_eq!(snapshot.state, AuthState::Authenticated);
    assert_eq!(snapshot.user, Some(alice));
    assert!(!h.backend.calls().contains(&"logout".to_owned()));
}

#[tokio::test]
async fn sign_out_during_sign_in_drops_late_session() {
    let h = harness("/login");
    let (slow, release) = Scripted::held(signed_in(&user("alice@example.com"), "Login successful!"));
    h.backend.push(slow);

    let pending = start_sign_in(&h, "secret1").await;
    wait_for_calls(&h.backend, 1).await;
    let sign_out = {
        let store = Arc::clone(&h.store);
        tokio::spawn(async move { store.sign_out().await })
    };
    while h.store.snapshot().state != AuthState::Transitioning {
        tokio::task::yield_now().await;
    }

    release.send(()).unwrap();
    assert!(!pending.await.unwrap().success);
    sign_out.await.unwrap();

    assert_eq!(h.store.snapshot().state, AuthState::Unauthenticated);
    assert_eq!(h.backend.calls(), vec!["login alice@example.com", "logout", "logout"]);
}

#[tokio::test]
async fn failed_sign_in_ends_previous_session() {
    let h = harness("/login");
    h.backend.push(Scripted::now(signed_in(&user("alice@example.com"), "Login successful!")));
    h.backend.push(Scripted::now(Err(rejected(401, "Invalid email or password"))));
    assert!(h.store.sign_in("alice@example.com", "secret1").await.success);

    assert!(!h.store.sign_in("alice@example.com", "wrong").await.success);

    assert!(h.store.user().is_none());
    assert_eq!(h.backend.calls().last().map(String::as_str), Some("logout"));
}

#[tokio::test]
async fn login_logout_login_ends_authenticated_iff_last_login_succeeds() {
    for (first_ok, last_ok) in [(true, true), (true, false), (false, true), (false, false)] {
        let h = harness("/login");
        for ok in [first_ok, last_ok] {
            let reply = if ok {
                signed_in(&user("alice@example.com"), "Login successful!")
            } else {
                Err(rejected(401, "Invalid email or password"))
            };
            h.backend.push(Scripted::now(reply));
        }

        h.store.sign_in("alice@example.com", "secret1").await;
        h.store.sign_out().await;
        h.store.sign_in("alice@example.com", "secret1").await;

        assert_eq!(h.store.snapshot().is_authenticated(), last_ok, "first={first_ok} last={last_ok}");
    }
}

#[tokio::test]
async fn stale_operation_sends_no_notice() {
    let h = harness("/login");
    let (slow, release) = Scripted::held(Err(rejected(401, "stale")));
    h.backend.push(slow);
    h.backend.push(Scripted::now(Err(rejected(401, "fresh"))));
    let mut notices = h.store.notices();

    let first = start_sign_in(&h, "x").await;
    wait_for_calls(&h.backend, 1).await;
    let second = start_sign_in(&h, "y").await;
    release.send(()).unwrap();
    first.await.unwrap();
    second.await.unwrap();

    assert_eq!(notices.try_recv().unwrap().description, "fresh");
    assert!(notices.try_recv().is_err());
}

// =============================================================================
// admin
// =============================================================================

#[tokio::test]
async fn is_admin_matches_email_ignoring_case() {
    let h = harness("/");
    assert!(!h.store.is_admin());

    h.backend.set_session(Ok(Some(user(&ADMIN_EMAIL.to_uppercase()))));
    h.store.check_session().await;
    assert!(h.store.is_admin());

    h.backend.set_session(Ok(Some(user("bob@example.com"))));
    h.store.check_session().await;
    assert!(!h.store.is_admin());
}

#[tokio::test]
async fn is_admin_false_without_configured_email() {
    let backend = Arc::new(MockBackend::default());
    let navigator = Arc::new(crate::util::navigator::MemoryNavigator::default());
    let store = AuthStore::new(backend.clone(), navigator);
    backend.set_session(Ok(Some(user(ADMIN_EMAIL))));
    store.check_session().await;
    assert!(!store.is_admin());
}

#[tokio::test]
async fn list_users_returns_none_on_failure() {
    let h = harness("/");
    assert_eq!(h.store.list_users().await, None);

    let admin = AdminUser {
        id: uuid::Uuid::new_v4(),
        email: ADMIN_EMAIL.into(),
        created_at: "2025-01-01T00:00:00Z".into(),
    };
    h.backend.set_users(vec![admin.clone()]);
    assert_eq!(h.store.list_users().await, Some(vec![admin]));
}
