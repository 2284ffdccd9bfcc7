//! LifeOS auth server.
//!
//! Exposes the router and its building blocks so the binary, the client's
//! end-to-end tests, and any embedding host assemble the same service.

pub mod config;
pub mod db;
pub mod routes;
pub mod services;
pub mod state;

use std::path::Path;

use tokio::net::TcpListener;

use crate::state::AppState;

/// Serve the application on an already-bound listener until the task is
/// cancelled or the listener fails.
///
/// # Errors
///
/// Returns the underlying I/O error if serving stops abnormally.
pub async fn serve(listener: TcpListener, state: AppState, web_dir: Option<&Path>) -> std::io::Result<()> {
    let app = routes::app(state, web_dir);
    axum::serve(listener, app).await
}
