//! Etherscan exporter binary.
//!
//! Serves a Prometheus scrape endpoint backed by the Etherscan API:
//!
//! - `GET /metrics` runs one collection across every configured network,
//! - `GET /health` reports liveness.
//!
//! Collection happens synchronously inside the scrape; nothing is cached
//! between requests.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;

use collector::{ExporterConfig, Scrape, build_collector};
use exporter::config::Cli;
use exporter::create_router;
use exporter::state::{AppState, SharedState};

fn main() {
    // Basic tracing setup.
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "exporter=info,collector=info".to_string()),
        )
        .init();

    if let Err(e) = run() {
        eprintln!("fatal error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let cfg = Cli::parse()
        .into_config()
        .map_err(|e| format!("invalid configuration: {e}"))?;

    log_startup(&cfg);

    // Built outside the runtime: the blocking HTTP client owns its own
    // runtime and must not be created or dropped from async context.
    let collector = Arc::new(
        build_collector(&cfg).map_err(|e| format!("failed to initialise collector: {e}"))?,
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| format!("failed to start tokio runtime: {e}"))?;

    let scrape: Arc<dyn Scrape> = collector.clone();
    let state: SharedState = Arc::new(AppState::new(scrape));

    let result = runtime.block_on(serve(cfg.listen_addr, state));

    drop(runtime);
    drop(collector);
    result
}

async fn serve(addr: SocketAddr, state: SharedState) -> Result<(), String> {
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("failed to bind {addr}: {e}"))?;

    tracing::info!("exporter listening on http://{}/metrics", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| format!("HTTP server error: {e}"))?;

    Ok(())
}

fn log_startup(cfg: &ExporterConfig) {
    let facts: Vec<&str> = cfg.collector.facts.iter().map(|f| f.as_str()).collect();
    let networks: Vec<String> = cfg
        .collector
        .networks
        .iter()
        .map(|n| match &n.address {
            Some(address) => format!("{}({address})", n.network),
            None => n.network.to_string(),
        })
        .collect();

    if facts.is_empty() {
        tracing::warn!("no facts enabled; /metrics will only expose empty families");
    }

    tracing::info!(
        facts = ?facts,
        networks = ?networks,
        timeout_secs = cfg.client.timeout.as_secs(),
        "collector configured"
    );
}

/// Waits for Ctrl-C and returns, used for graceful shutdown.
async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
