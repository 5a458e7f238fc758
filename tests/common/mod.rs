#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use std::time::Duration;

use async_trait::async_trait;
use lecture_relay::services::model::{Conversation, ModelBackend, ModelError, Turn};

/// In-memory backend that records every prompt and answers "reply N".
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    pub prompts: Arc<Mutex<Vec<String>>>,
    pub chats_started: Arc<AtomicUsize>,
    pub fail: Arc<AtomicBool>,
    pub panic: Arc<AtomicBool>,
    pub delay: Option<Duration>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self { delay: Some(delay), ..Self::default() }
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_panicking(&self, panic: bool) {
        self.panic.store(panic, Ordering::SeqCst);
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn chats_started(&self) -> usize {
        self.chats_started.load(Ordering::SeqCst)
    }
}

impl ModelBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn start_chat(&self) -> Box<dyn Conversation> {
        self.chats_started.fetch_add(1, Ordering::SeqCst);
        Box::new(ScriptedChat { backend: self.clone(), history: Vec::new() })
    }
}

struct ScriptedChat {
    backend: ScriptedBackend,
    history: Vec<Turn>,
}

#[async_trait]
impl Conversation for ScriptedChat {
    async fn send_message(&mut self, prompt: &str) -> Result<String, ModelError> {
        self.backend.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(delay) = self.backend.delay {
            tokio::time::sleep(delay).await;
        }
        if self.backend.panic.load(Ordering::SeqCst) {
            panic!("scripted backend panicked");
        }
        if self.backend.fail.load(Ordering::SeqCst) {
            return Err(ModelError::Api { status: 429, message: "quota exceeded".into() });
        }
        let reply = format!("reply {}", self.history.len() / 2 + 1);
        self.history.push(Turn::user(prompt));
        self.history.push(Turn::model(reply.clone()));
        Ok(reply)
    }

    fn history(&self) -> &[Turn] {
        &self.history
    }
}
