//! Quantis API server binary.
//!
//! Starts an HTTP server bridging quantis-core's session orchestrator to a
//! small REST API consumed by the student-facing UI.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use quantis_core::config::Config;
use quantis_core::storage;

use quantis_server::auth;
use quantis_server::state::AppState;

/// Quantis API server — serves the adaptive session planning API.
#[derive(Parser)]
#[command(name = "quantis-server", version, about)]
struct Cli {
    /// Port to listen on.
    #[arg(long, default_value = "3001")]
    port: u16,

    /// Host address to bind to. Use 0.0.0.0 for LAN access.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Path to the Quantis configuration file.
    #[arg(long, default_value = "~/.quantis/config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let config = Config::load(Some(&cli.config)).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "falling back to default configuration");
        Config::default()
    });

    let config_path = std::path::PathBuf::from(storage::expand_tilde(&cli.config));
    let config_dir = config_path.parent().unwrap_or_else(|| std::path::Path::new("."));

    tracing::info!(
        db = %config.storage.db_path,
        host = %cli.host,
        port = cli.port,
        "starting quantis server"
    );

    let pool = storage::init_db(&config.storage.db_path).await?;

    let api_token = auth::ensure_api_token(config_dir)?;
    tracing::info!(token_path = %config_dir.join("api_token").display(), "API token ready");

    let state = Arc::new(AppState {
        db: pool,
        config,
        config_path,
        api_token,
    });

    let router = quantis_server::build_router(state);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", cli.host, cli.port)).await?;
    tracing::info!("listening on http://{}:{}", cli.host, cli.port);
    axum::serve(listener, router).await?;

    Ok(())
}
