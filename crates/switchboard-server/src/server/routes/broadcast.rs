//! POST /api/v1/broadcast - Send a text message to every live connection.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::post,
    Router,
};
use tracing::info;

use super::{ApiError, TextMessageRequest};
use crate::server::AppState;

/// Create the broadcast router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/broadcast", post(broadcast_handler))
        .with_state(state)
}

/// Responds 202 with the fan-out report. Per-connection failures are
/// counted, never turned into an error.
async fn broadcast_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TextMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let text = request.into_text()?;

    let report = state.registry.broadcast_text(text);
    info!(
        attempted = report.attempted,
        failed = report.failed,
        "Broadcast requested over HTTP"
    );

    Ok((StatusCode::ACCEPTED, Json(report)))
}
