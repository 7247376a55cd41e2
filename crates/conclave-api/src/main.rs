//! Conclave API server
//!
//! Serves one shared agent network over HTTP and sweeps idle team members
//! in the background.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use conclave_common::ConclaveConfig;
use conclave_core::{Network, PromptStore};
use conclave_llm::GenaiService;
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod api;

use api::AppContext;

/// Command-line arguments for the Conclave API server
#[derive(Parser, Debug)]
#[clap(name = "conclave-api", about = "HTTP API server for Conclave agent networks")]
struct Args {
    /// Path to a TOML configuration file
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Path to the prompt file
    #[clap(long)]
    prompts: Option<PathBuf>,

    /// Host to bind to
    #[clap(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[clap(short, long, default_value = "5000")]
    port: u16,

    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,
}

/// Periodically evict idle team members
fn spawn_cleanup_task(context: AppContext, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = context.network.lock().await.cleanup_idle();
            debug!("Idle sweep removed {} instance(s)", removed);
        }
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Conclave API server...");

    let mut config = ConclaveConfig::load(args.config.as_deref())?;
    if let Some(path) = args.prompts {
        config.prompts_path = Some(path);
    }
    config.require_api_key()?;

    let prompts = Arc::new(PromptStore::from_path(config.prompts_path.as_deref())?);
    let service = Arc::new(GenaiService::new());

    let mut network = Network::from_config(service, prompts, &config);
    network.initialize().await?;
    let context = AppContext::new(network);

    let cleanup = spawn_cleanup_task(
        context.clone(),
        Duration::from_secs(config.cleanup_interval_secs.max(1)),
    );

    let app = api::api_routes(context.clone()).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr = format!("{}:{}", args.host, args.port);
    info!("Binding to address: {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cleanup.abort();
    let removed = context.network.lock().await.shutdown();
    info!("Server stopped ({} idle instance(s) removed)", removed);
    Ok(())
}
