// src/message.rs
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_CHAT_ID: &str = "default";

/// Validated body of `POST /api/chat`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub user_message: String,
    pub chat_id: String,
    pub summary: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub api_key_configured: bool,
    pub active_sessions: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TestResponse {
    pub message: String,
    pub received_data: Value,
    pub api_key_configured: bool,
}

/// Why a chat payload was rejected; `Display` is the client-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("No data received")]
    Empty,

    #[error("Invalid input. Please provide a valid message.")]
    InvalidMessage,
}

/// `null`, `false`, zero, and empty strings, arrays and objects carry no data.
pub fn is_empty_payload(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

impl ChatRequest {
    pub fn from_json(value: &Value) -> Result<Self, PayloadError> {
        if is_empty_payload(value) {
            return Err(PayloadError::Empty);
        }
        let obj = value.as_object().ok_or(PayloadError::InvalidMessage)?;

        let user_message = match obj.get("userMessage") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            _ => return Err(PayloadError::InvalidMessage),
        };

        let chat_id = match obj.get("chatId") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => DEFAULT_CHAT_ID.to_string(),
        };

        let summary = match obj.get("summary") {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        };

        Ok(Self { user_message, chat_id, summary })
    }
}
