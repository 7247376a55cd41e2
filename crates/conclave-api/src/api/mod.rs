//! HTTP endpoints for a shared Conclave network

pub mod network;

use axum::Router;
use conclave_core::Network;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;

/// Shared state handed to every handler through axum `State`
#[derive(Clone)]
pub struct AppContext {
    pub network: Arc<Mutex<Network>>,
    pub started_at: Instant,
}

impl AppContext {
    pub fn new(network: Network) -> Self {
        Self {
            network: Arc::new(Mutex::new(network)),
            started_at: Instant::now(),
        }
    }
}

/// All `/api` routes
pub fn api_routes(context: AppContext) -> Router {
    network::network_routes(context)
}
