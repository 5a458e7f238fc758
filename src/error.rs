// src/error.rs
use std::any::Any;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{message::ErrorResponse, services::model::ModelError};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("Failed to get a response from the AI: {0}")]
    Model(#[from] ModelError),

    #[error("Failed to get a response from the AI: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Model(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Server-side failures are logged where they happen, with request context.
        if let AppError::BadRequest(msg) = &self {
            tracing::warn!(error = %msg, "rejected request");
        }
        (self.status(), Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}

/// Turns a handler panic into the JSON 500 clients get for any internal error.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        *s
    } else {
        "unknown panic payload"
    };
    tracing::error!(panic = %detail, "request handler panicked");
    AppError::Internal("unexpected internal error".to_string()).into_response()
}
