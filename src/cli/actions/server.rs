use crate::auth::{AuthConfig, Authenticator, SystemClock};
use crate::cli::telemetry;
use crate::store::{
    postgres, JsonSessionStore, MemoryUserStore, PgSessionStore, PgUserStore, SessionStore,
    UserStore,
};
use crate::turnstile::{self, AppState};
use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: Option<String>,
    pub auth: AuthConfig,
    pub session_file: PathBuf,
}

type Stores = (Arc<dyn UserStore>, Arc<dyn SessionStore>);

async fn stores(args: &Args) -> Result<Stores> {
    let Some(dsn) = &args.dsn else {
        let users: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new());
        let sessions: Arc<dyn SessionStore> = Arc::new(JsonSessionStore::open(&args.session_file));
        return Ok((users, sessions));
    };

    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(dsn)
        .await
        .context("Failed to connect to database")?;

    postgres::ensure_schema(&pool)
        .await
        .context("Failed to create database schema")?;

    let users: Arc<dyn UserStore> = Arc::new(PgUserStore::new(pool.clone()));
    let sessions: Arc<dyn SessionStore> = Arc::new(PgSessionStore::new(pool));
    Ok((users, sessions))
}

/// Execute the server action.
/// # Errors
/// Returns an error if the stores can not be opened or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let (users, sessions) = stores(&args).await?;

    let authenticator =
        Authenticator::from_config(&args.auth, users.clone(), sessions, Arc::new(SystemClock))
            .await
            .context("Failed to initialize authentication")?;

    let state = AppState::new(authenticator, args.auth.excluded_paths().clone(), users);

    let result = turnstile::new(args.port, state).await;
    telemetry::shutdown_tracer();
    result
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        (
            "users",
            if args.dsn.is_some() { "postgres" } else { "memory" }.to_string(),
        ),
        (
            "auth_type",
            args.auth
                .auth_type()
                .map_or_else(|| "none".to_string(), |auth_type| auth_type.to_string()),
        ),
        ("session_name", args.auth.session_name().to_string()),
        (
            "session_duration",
            args.auth.session_duration().to_string(),
        ),
        ("session_file", args.session_file.display().to_string()),
    ];

    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "turnstile {} - {}\n\nStartup configuration:",
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in &entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn short_commit(hash: &str) -> String {
    let trimmed = hash.trim();
    if trimmed.len() > 7 {
        trimmed[..7].to_string()
    } else {
        trimmed.to_string()
    }
}
