//! # Passgate Server
//!
//! Demo binary that serves the Passgate middleware behind a small axum router:
//! password generation, token refresh/renewal, and a protected `/me` endpoint.
//!
//! Configuration comes from `.env`, `passgate.toml` and `PASSGATE__*` environment
//! variables; the command line can override the listen address.

use clap::Parser;
use passgate_api::{build_router, Passgate};
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "passgate", version, about = "Password and JWT middleware demo server")]
struct Args {
    /// Listen address (overrides server.host)
    #[arg(long)]
    host: Option<String>,

    /// Listen port (overrides server.port)
    #[arg(long)]
    port: Option<u16>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = passgate_common::config::init()?;

    // Initialize tracing (structured logging)
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "passgate=debug,tower_http=debug".into());
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true);
    if args.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    tracing::info!("Starting Passgate v{}", env!("CARGO_PKG_VERSION"));
    tracing::debug!(auth = ?config.auth, policy = ?config.password, "Configuration loaded");

    let gate = Arc::new(Passgate::from_config(&config));
    let router = build_router(gate);

    let host = args.host.unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);
    let addr = SocketAddr::new(host.parse()?, port);

    tracing::info!("REST API listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}
