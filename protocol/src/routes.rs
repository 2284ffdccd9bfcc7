//! Route policy shared by the server middleware and the client route guard.
//!
//! Paths fall into four classes. Auth pages are the login and signup screens;
//! public paths never require a session; everything else is protected, and
//! protected paths under `/api/` answer with `401` instead of a redirect.

/// Where signed-in users land.
pub const HOME_ROUTE: &str = "/";
pub const LOGIN_ROUTE: &str = "/login";
pub const SIGNUP_ROUTE: &str = "/signup";

const AUTH_PAGES: [&str; 2] = [LOGIN_ROUTE, SIGNUP_ROUTE];

const PUBLIC_PREFIXES: [&str; 8] = [
    crate::LOGIN_PATH,
    crate::SIGNUP_PATH,
    crate::SESSION_PATH,
    crate::LOGOUT_PATH,
    "/favicon.ico",
    "/static/",
    "/assets/",
    "/healthz",
];

/// Classification of a request path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RouteKind {
    /// `/login` or `/signup`.
    AuthPage,
    /// Reachable with or without a session.
    Public,
    /// Protected JSON endpoint.
    ProtectedApi,
    /// Protected page.
    ProtectedPage,
}

impl RouteKind {
    #[must_use]
    pub fn is_protected(self) -> bool {
        matches!(self, Self::ProtectedApi | Self::ProtectedPage)
    }
}

/// Strip a query string, fragment and trailing slash so `/login/?next=x`
/// classifies like `/login`.
fn normalize(path: &str) -> &str {
    let end = path.find(['?', '#']).unwrap_or(path.len());
    let path = &path[..end];
    if path.len() > 1 { path.trim_end_matches('/') } else { path }
}

/// Classify a request path.
#[must_use]
pub fn classify(path: &str) -> RouteKind {
    let path = normalize(path);
    if AUTH_PAGES.contains(&path) {
        return RouteKind::AuthPage;
    }
    if PUBLIC_PREFIXES.iter().any(|prefix| path.starts_with(prefix)) {
        return RouteKind::Public;
    }
    if path == "/api" || path.starts_with("/api/") {
        return RouteKind::ProtectedApi;
    }
    RouteKind::ProtectedPage
}

/// Where a visitor on `path` should be sent, if anywhere.
///
/// Signed-in visitors leave the auth pages for [`HOME_ROUTE`]; anonymous
/// visitors on protected pages go to [`LOGIN_ROUTE`]. API paths never
/// redirect: the server answers them with `401` and the client leaves them
/// alone.
#[must_use]
pub fn redirect_for(path: &str, authenticated: bool) -> Option<&'static str> {
    match (classify(path), authenticated) {
        (RouteKind::AuthPage, true) => Some(HOME_ROUTE),
        (RouteKind::ProtectedPage, false) => Some(LOGIN_ROUTE),
        _ => None,
    }
}

#[cfg(test)]
#[path = "routes_test.rs"]
mod tests;
