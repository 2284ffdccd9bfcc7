use std::sync::Arc;

use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use client::net::api::{ClientError, HttpSessionBackend};
use client::state::auth::{AuthOutcome, AuthStore, Notice, NoticeLevel};
use client::util::navigator::{MemoryNavigator, Navigator};
use protocol::routes::HOME_ROUTE;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;


#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("health check failed: HTTP {0}")]
    Unhealthy(u16),
    #[error("{0}")]
    Rejected(String),
    #[error("not signed in")]
    NoSession,
    #[error("user list unavailable; sign in as the admin account")]
    NotAdmin,
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "lifeos-cli", about = "LifeOS auth API CLI")]
struct Cli {
    #[arg(long, env = "LIFEOS_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    #[arg(long, env = "LIFEOS_SESSION_TOKEN")]
    session_token: Option<String>,

    #[arg(long, env = "LIFEOS_ADMIN_EMAIL")]
    admin_email: Option<String>,

    /// Location the session starts from, as a browser tab would.
    #[arg(long, default_value = HOME_ROUTE)]
    path: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Ping,
    /// Show the user behind the session token.
    Session,
    Login(CredentialArgs),
    Signup(CredentialArgs),
    Logout,
    /// List every account (admin only).
    Users,
}

#[derive(Args, Debug)]
struct CredentialArgs {
    #[arg(long)]
    email: String,

    #[arg(long, env = "LIFEOS_PASSWORD", hide_env_values = true)]
    password: String,
}

/// Navigator for a terminal: prints each move and is ready immediately.
struct TerminalNavigator {
    inner: MemoryNavigator,
}

#[async_trait]
impl Navigator for TerminalNavigator {
    fn current_path(&self) -> String {
        self.inner.current_path()
    }

    async fn navigate(&self, path: &str) {
        eprintln!("-> {path}");
        self.inner.navigate(path).await;
    }
}

struct Session {
    backend: Arc<HttpSessionBackend>,
    store: AuthStore,
    notices: broadcast::Receiver<Notice>,
}

impl Session {
    fn open(cli: &Cli) -> Result<Self, CliError> {
        let backend = Arc::new(HttpSessionBackend::new(&cli.base_url)?);
        if let Some(token) = cli.session_token.as_deref() {
            backend.set_session_token(token);
        }
        let navigator = Arc::new(TerminalNavigator { inner: MemoryNavigator::new(&cli.path) });
        let mut store = AuthStore::new(backend.clone(), navigator);
        if let Some(email) = cli.admin_email.as_deref() {
            store = store.with_admin_email(email);
        }
        let notices = store.notices();
        Ok(Self { backend, store, notices })
    }

    /// Print notices published so far.
    fn flush_notices(&mut self) {
        while let Ok(notice) = self.notices.try_recv() {
            eprintln!("{}", render_notice(&notice));
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Command::Ping => run_ping(&cli).await,
        Command::Session => run_session(&cli).await,
        Command::Login(args) => run_credentials(&cli, args, false).await,
        Command::Signup(args) => run_credentials(&cli, args, true).await,
        Command::Logout => run_logout(&cli).await,
        Command::Users => run_users(&cli).await,
    }
}

async fn run_ping(cli: &Cli) -> Result<(), CliError> {
    let url = format!("{}/healthz", cli.base_url.trim_end_matches('/'));
    let response = reqwest::get(url).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::Unhealthy(status.as_u16()));
    }
    println!("ok");
    Ok(())
}

async fn run_session(cli: &Cli) -> Result<(), CliError> {
    let mut session = Session::open(cli)?;
    let user = session.store.check_session().await;
    session.flush_notices();
    let admin = session.store.is_admin();
    print_json(&json!({ "user": user, "admin": admin }))
}

async fn run_credentials(cli: &Cli, args: &CredentialArgs, signup: bool) -> Result<(), CliError> {
    let mut session = Session::open(cli)?;
    let outcome = if signup {
        session.store.sign_up(&args.email, &args.password).await
    } else {
        session.store.sign_in(&args.email, &args.password).await
    };
    session.flush_notices();
    let AuthOutcome { success, message, user } = outcome;
    if !success {
        return Err(CliError::Rejected(message));
    }
    print_json(&json!({
        "user": user,
        "sessionToken": session.backend.session_token(),
    }))
}

async fn run_logout(cli: &Cli) -> Result<(), CliError> {
    let mut session = Session::open(cli)?;
    session.store.sign_out().await;
    session.flush_notices();
    Ok(())
}

async fn run_users(cli: &Cli) -> Result<(), CliError> {
    let mut session = Session::open(cli)?;
    if session.store.check_session().await.is_none() {
        session.flush_notices();
        return Err(CliError::NoSession);
    }
    let users = session.store.list_users().await.ok_or(CliError::NotAdmin)?;
    print_json(&json!({ "users": users }))
}

fn render_notice(notice: &Notice) -> String {
    let tag = match notice.level {
        NoticeLevel::Success => "ok",
        NoticeLevel::Info => "info",
        NoticeLevel::Error => "error",
    };
    format!("[{tag}] {}: {}", notice.title, notice.description)
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
