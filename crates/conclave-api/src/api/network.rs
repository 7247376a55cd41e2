//! Network endpoints: messaging, instance inspection, stats and reset

use super::AppContext;
use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::Utc;
use conclave_common::{ConclaveError, normalize_agent_id, truncate_string};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, error, info};

type ApiError = (StatusCode, Json<Value>);

fn error_response(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub message: Option<String>,
}

/// Run one user turn through the network
pub async fn send_message(
    State(context): State<AppContext>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let message = match payload {
        Ok(Json(request)) => request.message.unwrap_or_default(),
        Err(rejection) => {
            debug!("Rejected message payload: {}", rejection);
            String::new()
        }
    };
    if message.trim().is_empty() {
        return Err(error_response(StatusCode::BAD_REQUEST, "No message provided"));
    }

    info!("Received message: {}", truncate_string(&message, 80));
    let mut network = context.network.lock().await;
    match network.handle_user_input(&message).await {
        Ok(response) => Ok(Json(json!({ "response": response }))),
        Err(ConclaveError::InvalidInput(reason)) => {
            Err(error_response(StatusCode::BAD_REQUEST, reason))
        }
        Err(e) => {
            error!("Error handling message: {}", e);
            Err(error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// Coordinator plus every team member
pub async fn list_instances(State(context): State<AppContext>) -> impl IntoResponse {
    let network = context.network.lock().await;
    Json(network.list_agents())
}

pub async fn get_instance(
    State(context): State<AppContext>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let network = context.network.lock().await;
    network
        .agent_status(&normalize_agent_id(&id))
        .map(Json)
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "Instance not found"))
}

pub async fn network_stats(State(context): State<AppContext>) -> impl IntoResponse {
    let network = context.network.lock().await;
    Json(network.stats())
}

/// Drop every team member and the coordinator's history
pub async fn clear_network(State(context): State<AppContext>) -> impl IntoResponse {
    context.network.lock().await.reset();
    Json(json!({ "success": true }))
}

/// Liveness only; never waits on the network lock
pub async fn health_check(State(context): State<AppContext>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": context.started_at.elapsed().as_secs(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

pub fn network_routes(context: AppContext) -> Router {
    Router::new()
        .route("/api/send_message", post(send_message))
        .route("/api/instances", get(list_instances))
        .route("/api/instance/:id", get(get_instance))
        .route("/api/network/stats", get(network_stats))
        .route("/api/clear", post(clear_network))
        .route("/api/health", get(health_check))
        .with_state(context)
}
