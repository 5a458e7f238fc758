// src/services/model.rs
//! Capability interface for the hosted language model.
//!
//! The session registry only ever sees these traits, so any backend that can
//! start a conversation and answer a prompt can be plugged in.

use async_trait::async_trait;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Model,
}

/// One entry in a conversation's history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: TurnRole::User, text: text.into() }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self { role: TurnRole::Model, text: text.into() }
    }
}

/// Failures reported by a model backend.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("request to model failed: {0}")]
    Transport(String),

    #[error("model API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("prompt was blocked: {0}")]
    Blocked(String),

    #[error("malformed model response: {0}")]
    MalformedResponse(String),

    #[error("model returned an empty reply")]
    EmptyReply,
}

/// Stateful conversation handle owned by a single session.
#[async_trait]
pub trait Conversation: Send {
    /// Sends `prompt` with the accumulated history and returns the reply text.
    ///
    /// The user turn and the reply are appended to the history only once the
    /// backend answered; on error the history is left untouched.
    async fn send_message(&mut self, prompt: &str) -> Result<String, ModelError>;

    fn history(&self) -> &[Turn];
}

pub trait ModelBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Starts a conversation with an empty history.
    fn start_chat(&self) -> Box<dyn Conversation>;
}
