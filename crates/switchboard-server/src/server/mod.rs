use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::json;
use switchboard_registry::{ChannelConnection, ConnectionId, ConnectionRegistry};
use tokio::task::JoinHandle;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{debug, info, warn, Level};

use crate::config::ServerConfig;

mod routes;

/// Text queued for delivery to one WebSocket client.
pub type OutboundText = Arc<str>;

/// Registry handle for a WebSocket client: the sending half of its outbound queue.
pub type WsConnection = ChannelConnection<ConnectionId, OutboundText>;

/// Server application state
pub struct AppState {
    /// Live WebSocket connections
    pub registry: Arc<ConnectionRegistry<WsConnection>>,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        let registry = Arc::new(ConnectionRegistry::with_config(config.registry_config()));
        Self { registry, config }
    }
}

/// Start the HTTP server and run until Ctrl-C.
pub async fn start(config: ServerConfig) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let state = Arc::new(AppState::new(config));

    serve(listener, state, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve(
    listener: tokio::net::TcpListener,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let sweeper = spawn_prune_task(
        Arc::clone(&state.registry),
        state.config.prune_interval_secs,
    );

    let app = create_router(state);

    info!("Starting Axum HTTP server on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    info!("Server stopped");

    Ok(())
}

/// Create the Axum router with all routes and middleware
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(Arc::clone(&state))
        .merge(routes::websocket::router(Arc::clone(&state)))
        .merge(routes::connections::router(Arc::clone(&state)))
        .merge(routes::broadcast::router(state))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
}

/// Periodically drop registry members whose socket writer has exited.
fn spawn_prune_task(
    registry: Arc<ConnectionRegistry<WsConnection>>,
    interval_secs: u64,
) -> Option<JoinHandle<()>> {
    if interval_secs == 0 {
        debug!("Prune task disabled");
        return None;
    }

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        // First tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = registry.prune_closed();
            if removed > 0 {
                debug!(removed, remaining = registry.connection_count(), "Prune sweep");
            }
        }
    }))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C, shutting down");
        return;
    }
    info!("Shutdown signal received");
}

/// Health check endpoint (for load balancers)
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "switchboard-server",
            "version": env!("CARGO_PKG_VERSION"),
            "connections": state.registry.connection_count(),
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use http_body_util::BodyExt;
    use switchboard_registry::Connection;
    use tower::ServiceExt;

    fn create_test_state() -> Arc<AppState> {
        Arc::new(AppState::new(ServerConfig::default()))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&body).unwrap()
    }

    fn json_request(method: Method, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let state = create_test_state();
        let (conn, _rx) = WsConnection::channel(ConnectionId::new(), 4);
        state.registry.register(conn).unwrap();
        let app = create_router(state);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["service"], "switchboard-server");
        assert_eq!(json["connections"], 1);
    }

    #[tokio::test]
    async fn test_list_and_get_connection() {
        let state = create_test_state();
        let (conn, _rx) = WsConnection::channel(ConnectionId::new(), 4);
        state.registry.register(conn.clone()).unwrap();
        let short_id = conn.short_id().to_string();

        let response = create_router(Arc::clone(&state))
            .oneshot(
                Request::builder()
                    .uri("/api/v1/connections")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["total"], 1);
        assert_eq!(json["connections"][0]["short_id"], short_id.as_str());

        let response = create_router(state)
            .oneshot(
                Request::builder()
                    .uri(format!("/api/v1/connections/{}", short_id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["id"], conn.id().to_string());
    }

    #[tokio::test]
    async fn test_get_unknown_connection_is_404() {
        let app = create_router(create_test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/connections/deadbeef")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["error"], "not_found");
    }

    #[tokio::test]
    async fn test_get_malformed_short_id_is_400() {
        let app = create_router(create_test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/connections/not-a-short-id")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["error"], "invalid_short_id");
    }

    #[tokio::test]
    async fn test_send_message_to_connection() {
        let state = create_test_state();
        let (conn, mut rx) = WsConnection::channel(ConnectionId::new(), 4);
        state.registry.register(conn.clone()).unwrap();

        let response = create_router(state)
            .oneshot(json_request(
                Method::POST,
                &format!("/api/v1/connections/{}/messages", conn.short_id()),
                json!({ "text": "direct" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(rx.recv().await.as_deref(), Some("direct"));
    }

    #[tokio::test]
    async fn test_send_message_to_full_queue_is_503() {
        let state = create_test_state();
        let (conn, _rx) = WsConnection::channel(ConnectionId::new(), 1);
        state.registry.register(conn.clone()).unwrap();
        conn.send("filler".into()).unwrap();

        let response = create_router(state)
            .oneshot(json_request(
                Method::POST,
                &format!("/api/v1/connections/{}/messages", conn.short_id()),
                json!({ "text": "direct" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(response).await;
        assert_eq!(json["error"], "queue_full");
    }

    #[tokio::test]
    async fn test_send_empty_message_is_400() {
        let state = create_test_state();
        let (conn, _rx) = WsConnection::channel(ConnectionId::new(), 4);
        state.registry.register(conn.clone()).unwrap();

        let response = create_router(state)
            .oneshot(json_request(
                Method::POST,
                &format!("/api/v1/connections/{}/messages", conn.short_id()),
                json!({ "text": "" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_broadcast_endpoint() {
        let state = create_test_state();
        let (c1, mut rx1) = WsConnection::channel(ConnectionId::new(), 4);
        let (c2, rx2) = WsConnection::channel(ConnectionId::new(), 4);
        state.registry.register(c1).unwrap();
        state.registry.register(c2).unwrap();
        drop(rx2);

        let response = create_router(state)
            .oneshot(json_request(
                Method::POST,
                "/api/v1/broadcast",
                json!({ "text": "hello all" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let json = body_json(response).await;
        assert_eq!(json["attempted"], 2);
        assert_eq!(json["delivered"], 1);
        assert_eq!(json["failed"], 1);
        assert_eq!(rx1.recv().await.as_deref(), Some("hello all"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_prune_task_removes_closed_connections() {
        let registry = Arc::new(ConnectionRegistry::<WsConnection>::new());
        let (conn, rx) = WsConnection::channel(ConnectionId::new(), 4);
        registry.register(conn).unwrap();
        drop(rx);

        let sweeper = spawn_prune_task(Arc::clone(&registry), 5).unwrap();
        tokio::time::sleep(Duration::from_secs(6)).await;

        assert_eq!(registry.connection_count(), 0);
        sweeper.abort();
    }

    #[test]
    fn test_prune_task_disabled() {
        let registry = Arc::new(ConnectionRegistry::<WsConnection>::new());
        assert!(spawn_prune_task(registry, 0).is_none());
    }
}
