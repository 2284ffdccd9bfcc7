//! Spawn the real router on an ephemeral port for route tests.

use std::path::Path;

use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::redirect::Policy;
use tokio::net::TcpListener;

use crate::state::AppState;
use crate::state::test_helpers::test_app_state;

pub struct TestServer {
    pub base_url: String,
    pub state: AppState,
    /// Client that does not follow redirects and keeps no cookies; tests pass
    /// cookies explicitly.
    pub http: reqwest::Client,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(test_app_state(), None).await
    }

    pub async fn start_with(state: AppState, web_dir: Option<&Path>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind should succeed");
        let addr = listener.local_addr().expect("local addr");
        let app = super::app(state.clone(), web_dir);
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        let http = reqwest::Client::builder()
            .redirect(Policy::none())
            .build()
            .expect("client should build");
        Self { base_url: format!("http://{addr}"), state, http }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> reqwest::Response {
        let mut req = self.http.get(self.url(path));
        if let Some(token) = token {
            req = req.header(COOKIE, format!("{}={token}", protocol::SESSION_COOKIE));
        }
        req.send().await.expect("request should complete")
    }

    pub async fn post_json(&self, path: &str, body: &serde_json::Value, token: Option<&str>) -> reqwest::Response {
        let mut req = self.http.post(self.url(path)).json(body);
        if let Some(token) = token {
            req = req.header(COOKIE, format!("{}={token}", protocol::SESSION_COOKIE));
        }
        req.send().await.expect("request should complete")
    }
}

/// Value of the session cookie set by `resp`, if any (empty when cleared).
pub fn session_cookie_value(resp: &reqwest::Response) -> Option<String> {
    resp.headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|raw| {
            let first = raw.split(';').next()?;
            let (name, value) = first.split_once('=')?;
            (name.trim() == protocol::SESSION_COOKIE).then(|| value.trim().to_owned())
        })
}

/// Full `Set-Cookie` header for the session cookie, for attribute checks.
pub fn session_set_cookie_header(resp: &reqwest::Response) -> Option<String> {
    resp.headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|raw| raw.starts_with(protocol::SESSION_COOKIE))
        .map(str::to_owned)
}
