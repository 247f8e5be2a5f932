//! pwz-drafts - Property wizard draft service
//!
//! Serves the draft reconciliation engine over HTTP. Startup resolves
//! configuration (CLI > environment > TOML > defaults), opens the selected
//! storage backend and binds the listener.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use pwz_common::config::{self, StorageBackend, TomlConfig};
use pwz_drafts::retry::RetryPolicy;
use pwz_drafts::store::{DocumentStore, MemoryDocumentStore, SqliteDocumentStore};
use pwz_drafts::{build_router, AppState};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "pwz-drafts")]
#[command(about = "Property wizard draft reconciliation service")]
#[command(version)]
struct Args {
    /// Explicit TOML config file
    #[arg(short, long, env = "PWZ_CONFIG")]
    config: Option<PathBuf>,

    /// Root folder holding the database
    #[arg(short, long, env = "PWZ_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Listen address (host:port)
    #[arg(short, long, env = "PWZ_BIND_ADDR")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Start at info; the TOML logging level replaces this once config is read
    let (filter, filter_handle) = reload::Layer::new(
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting property wizard drafts service ({}) v{}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    );

    let args = Args::parse();
    let toml_config = TomlConfig::load(args.config.as_deref())?;

    if std::env::var("RUST_LOG").is_err() {
        match EnvFilter::try_new(&toml_config.logging.level) {
            Ok(level) => filter_handle.reload(level)?,
            Err(e) => error!("Invalid logging.level '{}': {}", toml_config.logging.level, e),
        }
    }

    let engine = &toml_config.engine;
    let store: Arc<dyn DocumentStore> = match engine.storage {
        StorageBackend::Sqlite => {
            let root_folder =
                config::resolve_root_folder(args.root_folder.as_deref(), &toml_config);
            let db_path = config::database_path(&root_folder, &toml_config);
            info!("Database path: {}", db_path.display());

            let pool = match pwz_common::db::init_database(&db_path).await {
                Ok(pool) => pool,
                Err(e) => {
                    error!("Failed to open database: {}", e);
                    return Err(e.into());
                }
            };
            let retry = RetryPolicy {
                attempt_timeout: pwz_common::time::millis_to_duration(engine.storage_timeout_ms),
                max_wait: pwz_common::time::millis_to_duration(engine.storage_retry_max_wait_ms),
            };
            Arc::new(SqliteDocumentStore::new(pool, retry))
        }
        StorageBackend::Memory => {
            info!("Using in-memory storage; drafts are lost on exit");
            Arc::new(MemoryDocumentStore::new())
        }
    };

    info!(
        max_conflict_attempts = engine.max_conflict_attempts,
        stale_client_policy = ?engine.stale_client_policy,
        "Reconciler configured"
    );

    let state = AppState::with_store(store, engine)?;
    let app = build_router(state);

    let bind_addr = config::resolve_bind_addr(args.bind.as_deref(), &toml_config);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("pwz-drafts listening on http://{}", bind_addr);
    info!("Health check: http://{}/health", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
