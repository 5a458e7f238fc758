// src/routes/mod.rs
pub mod chat;

use crate::{error::panic_response, state::SharedState};
use axum::{
    Router,
    routing::{get, post},
};
use chat::{chat_handler, health_handler, test_handler};
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

pub fn create_router() -> Router<SharedState> {
    Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/api/test", post(test_handler))
        .route("/health", get(health_handler))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
}
