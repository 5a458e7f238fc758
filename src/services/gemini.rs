// src/services/gemini.rs
//! Google Generative Language (Gemini) backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::model::{Conversation, ModelBackend, ModelError, Turn, TurnRole};

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

struct GeminiClient {
    http: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    fn endpoint(&self) -> String {
        let model = self.model.strip_prefix("models/").unwrap_or(&self.model);
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            model
        )
    }

    async fn generate(&self, history: &[Turn], prompt: &str) -> Result<String, ModelError> {
        let body = request_body(history, prompt);

        let response = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|env| env.error.message)
                .unwrap_or(text);
            return Err(ModelError::Api { status: status.as_u16(), message });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ModelError::MalformedResponse(e.to_string()))?;

        extract_reply(parsed)
    }
}

fn request_body<'a>(history: &'a [Turn], prompt: &'a str) -> GenerateContentRequest<'a> {
    let mut contents: Vec<Content<'a>> = history
        .iter()
        .map(|turn| Content {
            role: match turn.role {
                TurnRole::User => "user",
                TurnRole::Model => "model",
            },
            parts: vec![Part { text: &turn.text }],
        })
        .collect();
    contents.push(Content { role: "user", parts: vec![Part { text: prompt }] });
    GenerateContentRequest { contents }
}

fn extract_reply(response: GenerateContentResponse) -> Result<String, ModelError> {
    if let Some(err) = response.error {
        return Err(ModelError::Api { status: 200, message: err.message });
    }

    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(ModelError::Blocked(reason));
    }

    let candidate = response
        .candidates
        .and_then(|c| c.into_iter().next())
        .ok_or_else(|| ModelError::MalformedResponse("no candidates in response".into()))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return match candidate.finish_reason.as_deref() {
            Some("SAFETY") => Err(ModelError::Blocked("SAFETY".into())),
            _ => Err(ModelError::EmptyReply),
        };
    }

    Ok(text)
}

/// Backend that opens chats against the Gemini `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiBackend {
    client: Arc<GeminiClient>,
}

impl std::fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiBackend")
            .field("model", &self.client.model)
            .field("base_url", &self.client.base_url)
            .finish()
    }
}

impl GeminiBackend {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ModelError> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ModelError::Transport(e.to_string()))?;

        Ok(Self {
            client: Arc::new(GeminiClient {
                http,
                api_key: api_key.into(),
                model: model.into(),
                base_url: base_url.into(),
            }),
        })
    }
}

impl ModelBackend for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    fn start_chat(&self) -> Box<dyn Conversation> {
        Box::new(GeminiChat { client: Arc::clone(&self.client), history: Vec::new() })
    }
}

pub struct GeminiChat {
    client: Arc<GeminiClient>,
    history: Vec<Turn>,
}

#[async_trait]
impl Conversation for GeminiChat {
    async fn send_message(&mut self, prompt: &str) -> Result<String, ModelError> {
        let reply = self.client.generate(&self.history, prompt).await?;
        self.history.push(Turn::user(prompt));
        self.history.push(Turn::model(reply.clone()));
        Ok(reply)
    }

    fn history(&self) -> &[Turn] {
        &self.history
    }
}
