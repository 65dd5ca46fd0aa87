//! Demo server for the embeddable HTTP application shell.
//!
//! Loads an optional TOML configuration, mounts a couple of routes and runs
//! until interrupted, then shuts down gracefully.

use std::path::PathBuf;
use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use app_shell::config::loader::load_config;
use app_shell::{AppShell, ConfigStore};

#[derive(Parser)]
#[command(name = "app-shell", about = "Demo server for the HTTP application shell")]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Port to listen on (0 picks an ephemeral port).
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "app_shell=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let store = match &args.config {
        Some(path) => load_config(path)?,
        None => ConfigStore::default(),
    };

    tracing::info!(
        host = %store.host,
        max_request_size = store.max_request_size,
        async_request_timeout_ms = store.async_request_timeout_ms,
        context_path = %store.context_path,
        "configuration loaded"
    );

    let routes = Router::new()
        .route("/", get(|| async { "app-shell demo" }))
        .route(
            "/health",
            get(|| async { Json(serde_json::json!({ "status": "ok" })) }),
        );

    let app = Arc::new(AppShell::with_store(store).routes(routes));
    app.start(args.port).await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    app.stop().await;

    Ok(())
}
