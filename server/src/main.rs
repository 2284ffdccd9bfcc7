use std::sync::Arc;

use server::config::AppConfig;
use server::services::password::PasswordService;
use server::services::users::{MemoryUserStore, PgUserStore, UserStore};
use server::state::AppState;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env().expect("invalid configuration");

    let users: Arc<dyn UserStore> = match &config.database_url {
        Some(url) => {
            let pool = server::db::init_pool(url, config.db_max_connections)
                .await
                .expect("database init failed");
            Arc::new(PgUserStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory user store (accounts are lost on restart)");
            Arc::new(MemoryUserStore::new())
        }
    };

    let web_dir = config.web_dir.is_dir().then_some(config.web_dir.as_path());
    if web_dir.is_none() {
        tracing::info!(dir = %config.web_dir.display(), "front-end directory missing, serving API only");
    }

    let state = AppState::new(users, config.auth.clone(), PasswordService::default());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("failed to bind");

    tracing::info!(port = config.port, env = ?config.environment, "lifeos listening");
    server::serve(listener, state, web_dir).await.expect("server failed");
}
