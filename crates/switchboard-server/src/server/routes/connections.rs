//! Connection lookup API Routes
//!
//! - GET /api/v1/connections - List live connections
//! - GET /api/v1/connections/:short_id - Resolve a short id
//! - POST /api/v1/connections/:short_id/messages - Queue a text message for one connection

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::json;
use switchboard_registry::{Connection, ShortId};
use tracing::{debug, instrument};

use super::{ApiError, TextMessageRequest};
use crate::server::AppState;

/// Create the connections router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/connections", get(list_connections_handler))
        .route("/api/v1/connections/:short_id", get(get_connection_handler))
        .route(
            "/api/v1/connections/:short_id/messages",
            post(send_message_handler),
        )
        .with_state(state)
}

/// One live connection
#[derive(Debug, Serialize)]
pub struct ConnectionResponse {
    pub short_id: String,
    pub id: String,
}

#[derive(Debug, Serialize)]
pub struct ListConnectionsResponse {
    pub connections: Vec<ConnectionResponse>,
    pub total: usize,
}

/// GET /api/v1/connections
async fn list_connections_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut connections: Vec<ConnectionResponse> = state
        .registry
        .list_connections()
        .into_iter()
        .map(|(short_id, id)| ConnectionResponse {
            short_id: short_id.to_string(),
            id: id.to_string(),
        })
        .collect();
    connections.sort_by(|a, b| a.short_id.cmp(&b.short_id));

    let total = connections.len();
    Json(ListConnectionsResponse { connections, total })
}

/// GET /api/v1/connections/:short_id
#[instrument(skip(state))]
async fn get_connection_handler(
    State(state): State<Arc<AppState>>,
    Path(short_id): Path<String>,
) -> Result<Json<ConnectionResponse>, ApiError> {
    let short_id = ShortId::parse(&short_id)?;
    let connection = state.registry.find(&short_id)?;

    Ok(Json(ConnectionResponse {
        short_id: short_id.to_string(),
        id: connection.id().to_string(),
    }))
}

/// POST /api/v1/connections/:short_id/messages
///
/// 202 once the message is queued on the connection; delivery to the peer
/// happens on the socket's writer task.
#[instrument(skip(state, request))]
async fn send_message_handler(
    State(state): State<Arc<AppState>>,
    Path(short_id): Path<String>,
    Json(request): Json<TextMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let short_id = ShortId::parse(&short_id)?;
    let text = request.into_text()?;

    state.registry.send_to(short_id.as_str(), text.into())?;
    debug!(short_id = %short_id, "Queued targeted message");

    Ok((StatusCode::ACCEPTED, Json(json!({ "status": "queued" }))))
}
