use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, header::CONTENT_TYPE},
};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    error::AppError,
    message::{ChatRequest, ChatResponse, HealthResponse, TestResponse},
    services::prompt::build_prompt,
    state::SharedState,
};

const NOT_JSON: &str = "Request must be JSON";

pub async fn chat_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ChatResponse>, AppError> {
    let request_id = Uuid::new_v4();
    tracing::info!(%request_id, "received request to /api/chat");

    let payload = parse_json_body(&headers, &body)?;
    let request = ChatRequest::from_json(&payload).map_err(|e| AppError::BadRequest(e.to_string()))?;

    tracing::info!(
        %request_id,
        chat_id = %request.chat_id,
        message_len = request.user_message.len(),
        summary_len = request.summary.as_deref().map_or(0, str::len),
        "validated chat request"
    );

    // Held until the reply is recorded so turns on one chat never interleave.
    let mut session = state
        .sessions
        .get_or_create_session(&request.chat_id, request.summary.as_deref())
        .await;

    let prompt = build_prompt(&request.user_message, &session.summary);
    tracing::info!(%request_id, prompt_len = prompt.len(), "sending prompt to model");

    let reply = session.send(&prompt).await.inspect_err(|err| {
        tracing::error!(%request_id, chat_id = %request.chat_id, error = %err, "model call failed");
    })?;

    tracing::info!(%request_id, reply_len = reply.len(), "received reply from model");
    Ok(Json(ChatResponse { reply }))
}

pub async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        api_key_configured: state.api_key_configured,
        active_sessions: state.sessions.len().await,
    })
}

// Echoes the payload back so clients can check connectivity without a model call.
pub async fn test_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<TestResponse>, AppError> {
    let received_data = parse_json_body(&headers, &body)?;
    Ok(Json(TestResponse {
        message: "Test endpoint working".to_string(),
        received_data,
        api_key_configured: state.api_key_configured,
    }))
}

fn is_json_content(headers: &HeaderMap) -> bool {
    let Some(value) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let mime = value.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    mime == "application/json" || (mime.starts_with("application/") && mime.ends_with("+json"))
}

fn parse_json_body(headers: &HeaderMap, body: &[u8]) -> Result<Value, AppError> {
    if !is_json_content(headers) {
        return Err(AppError::BadRequest(NOT_JSON.to_string()));
    }
    serde_json::from_slice(body).map_err(|e| {
        tracing::debug!(error = %e, "request body is not valid JSON");
        AppError::BadRequest(NOT_JSON.to_string())
    })
}
