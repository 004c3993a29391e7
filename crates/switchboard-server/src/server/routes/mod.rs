// Route modules for Switchboard Server API
pub mod broadcast; // Fan-out to every live connection
pub mod connections; // Lookup and targeted send by short id
pub mod websocket; // Transport: registers sockets with the registry

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use switchboard_registry::{DeliveryError, RegistryError};
use thiserror::Error;

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    fn new(error: &str, message: &str) -> Self {
        Self {
            error: error.to_string(),
            message: message.to_string(),
        }
    }
}

/// Errors surfaced by the HTTP API
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Request body carrying a text message
#[derive(Debug, Deserialize)]
pub struct TextMessageRequest {
    pub text: String,
}

impl TextMessageRequest {
    /// The message text, rejecting blank input.
    fn into_text(self) -> Result<String, ApiError> {
        if self.text.trim().is_empty() {
            return Err(ApiError::InvalidInput(
                "Message text cannot be empty".to_string(),
            ));
        }
        Ok(self.text)
    }
}

/// Convert ApiError to HTTP response
fn api_error_to_response(err: ApiError) -> (StatusCode, Json<ErrorResponse>) {
    let (status, error_code) = match &err {
        ApiError::Registry(registry_err) => match registry_err {
            RegistryError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            RegistryError::InvalidShortId(_) => (StatusCode::BAD_REQUEST, "invalid_short_id"),
            RegistryError::DuplicateShortId(_) => (StatusCode::CONFLICT, "duplicate_short_id"),
            RegistryError::Delivery(DeliveryError::Full) => {
                (StatusCode::SERVICE_UNAVAILABLE, "queue_full")
            }
            RegistryError::Delivery(DeliveryError::Closed) => {
                (StatusCode::SERVICE_UNAVAILABLE, "connection_closed")
            }
        },
        ApiError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
    };

    (
        status,
        Json(ErrorResponse::new(error_code, &err.to_string())),
    )
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        api_error_to_response(self).into_response()
    }
}
