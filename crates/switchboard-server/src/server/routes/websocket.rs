//! WebSocket transport.
//!
//! Each upgraded socket becomes one registry member for as long as it stays
//! open. The socket is split: a writer task drains the connection's outbound
//! queue into the sink, while this task reads inbound frames.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use serde_json::json;
use switchboard_registry::{Connection, ConnectionId};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::server::{AppState, WsConnection};

/// Close code sent when the registry refuses the connection (policy violation).
const CLOSE_POLICY: u16 = 1008;

/// Create the WebSocket router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(websocket_handler))
        .with_state(state)
}

/// GET /ws
async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    debug!("WebSocket connection request");

    ws.on_upgrade(move |socket| {
        let id = ConnectionId::new();
        let span = info_span!("ws", id = %id);
        handle_socket(socket, id, state).instrument(span)
    })
}

/// Drive one WebSocket connection from registration to deregistration.
async fn handle_socket(mut socket: WebSocket, id: ConnectionId, state: Arc<AppState>) {
    let (connection, mut outbound) =
        WsConnection::channel(id, state.config.outbound_queue_capacity);
    let short_id = connection.short_id();

    if let Err(e) = state.registry.register(connection.clone()) {
        warn!(error = %e, "Connection refused by registry");
        let _ = socket
            .send(Message::Close(Some(CloseFrame {
                code: CLOSE_POLICY,
                reason: e.to_string().into(),
            })))
            .await;
        return;
    }
    info!(short_id = %short_id, "WebSocket connection established");

    // Queued before the writer starts, so it is always the first frame
    let welcome = json!({
        "type": "connected",
        "short_id": short_id,
        "id": id,
    });
    if let Err(e) = connection.send(welcome.to_string().into()) {
        warn!(error = %e, "Failed to queue welcome frame");
    }

    let (mut sink, mut stream) = socket.split();

    let writer = tokio::spawn(
        async move {
            while let Some(text) = outbound.recv().await {
                if let Err(e) = sink.send(Message::Text(text.to_string())).await {
                    debug!(error = %e, "Failed to write frame, stopping writer");
                    break;
                }
            }
            let _ = sink.close().await;
        }
        .in_current_span(),
    );

    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                debug!(len = text.len(), "Received text frame");
                if state.config.relay_inbound {
                    state.registry.broadcast_text(text);
                }
            }
            Ok(Message::Binary(data)) => {
                debug!(len = data.len(), "Ignoring binary frame");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                // Pongs are answered by the protocol layer
            }
            Ok(Message::Close(frame)) => {
                debug!(?frame, "WebSocket close requested");
                break;
            }
            Err(e) => {
                error!(error = %e, "WebSocket error");
                break;
            }
        }
    }

    state.registry.deregister(&connection);
    writer.abort();

    info!(short_id = %short_id, "WebSocket connection closed");
}
