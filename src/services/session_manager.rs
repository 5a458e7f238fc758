// src/services/session_manager.rs
use std::{
    collections::HashMap,
    fmt::Debug,
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::{
    sync::{Mutex, OwnedMutexGuard, RwLock},
    task::JoinHandle,
};

use super::model::{Conversation, ModelBackend, ModelError, Turn};

/// One ongoing conversation and the lecture summary grounding it.
pub struct Session {
    pub id: String,
    pub summary: String,
    conversation: Box<dyn Conversation>,
    last_active: Instant,
}

impl Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("summary_len", &self.summary.len())
            .field("turns", &self.conversation.history().len())
            .finish()
    }
}

impl Session {
    pub fn new(id: impl Into<String>, conversation: Box<dyn Conversation>) -> Self {
        Self {
            id: id.into(),
            summary: String::new(),
            conversation,
            last_active: Instant::now(),
        }
    }

    /// Overwrites the summary when `incoming` is non-empty. Returns whether it changed.
    pub fn apply_summary(&mut self, incoming: Option<&str>) -> bool {
        match incoming {
            Some(s) if !s.is_empty() && s != self.summary => {
                self.summary = s.to_string();
                true
            }
            _ => false,
        }
    }

    /// Prompts the model; the session counts as active until the call returns.
    pub async fn send(&mut self, prompt: &str) -> Result<String, ModelError> {
        self.touch();
        let result = self.conversation.send_message(prompt).await;
        self.touch();
        result
    }

    pub fn history(&self) -> &[Turn] {
        self.conversation.history()
    }

    pub fn last_active(&self) -> Instant {
        self.last_active
    }

    fn touch(&mut self) {
        self.last_active = Instant::now();
    }
}

/// A session with its lock held; dropping it releases the session.
pub type SessionGuard = OwnedMutexGuard<Session>;

/// Eviction knobs. The default keeps every session for the life of the process.
#[derive(Clone, Debug, Default)]
pub struct RegistryConfig {
    pub capacity: Option<usize>,
    pub idle_ttl: Option<Duration>,
}

type SessionMap = HashMap<String, Arc<Mutex<Session>>>;

#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RwLock<SessionMap>>,
    backend: Arc<dyn ModelBackend>,
    config: RegistryConfig,
}

impl Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("backend", &self.backend.name())
            .field("config", &self.config)
            .finish()
    }
}

impl SessionRegistry {
    pub fn new(backend: Arc<dyn ModelBackend>, config: RegistryConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            backend,
            config,
        }
    }

    /// Resolves `id` to its session, creating it on first sight, and locks it.
    ///
    /// The registry map is only locked for the lookup; the returned guard holds
    /// the per-session lock so the caller can prompt the model and record the
    /// reply without another request interleaving on the same conversation.
    pub async fn get_or_create_session(&self, id: &str, incoming_summary: Option<&str>) -> SessionGuard {
        let (session, created) = {
            let mut guard = self.inner.write().await;
            match guard.get(id) {
                Some(session) => (Arc::clone(session), false),
                None => {
                    if let Some(cap) = self.config.capacity.filter(|c| *c > 0) {
                        while guard.len() >= cap {
                            if !evict_least_recent(&mut guard) {
                                tracing::warn!(
                                    capacity = cap,
                                    sessions = guard.len(),
                                    "all chat sessions busy, exceeding capacity"
                                );
                                break;
                            }
                        }
                    }
                    let session = Arc::new(Mutex::new(Session::new(id, self.backend.start_chat())));
                    guard.insert(id.to_string(), Arc::clone(&session));
                    (session, true)
                }
            }
        };

        if created {
            tracing::info!(chat_id = %id, "created new chat session");
        } else {
            tracing::debug!(chat_id = %id, "using existing chat session");
        }

        let mut locked = session.lock_owned().await;
        locked.touch();
        if locked.apply_summary(incoming_summary) {
            tracing::debug!(chat_id = %id, summary_len = locked.summary.len(), "updated session summary");
        }
        locked
    }

    /// Copy of the session's conversation history.
    pub async fn history(&self, id: &str) -> Option<Vec<Turn>> {
        let session = self.lookup(id).await?;
        let guard = session.lock().await;
        Some(guard.history().to_vec())
    }

    pub async fn summary(&self, id: &str) -> Option<String> {
        let session = self.lookup(id).await?;
        let guard = session.lock().await;
        Some(guard.summary.clone())
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.inner.read().await.contains_key(id)
    }

    /// Remove a session by id
    pub async fn remove_session(&self, id: &str) -> bool {
        let mut guard = self.inner.write().await;
        guard.remove(id).is_some()
    }

    /// Remove sessions idle longer than the configured ttl. Returns number removed.
    ///
    /// Sessions held or awaited by a request are never removed.
    pub async fn purge_expired(&self) -> usize {
        let Some(ttl) = self.config.idle_ttl else {
            return 0;
        };
        let mut guard = self.inner.write().await;
        let now = Instant::now();
        let before = guard.len();
        guard.retain(|_, session| match idle_since(session) {
            Some(last_active) => now.duration_since(last_active) < ttl,
            None => true,
        });
        before - guard.len()
    }

    /// Periodically purges idle sessions. `None` when no idle ttl is configured.
    pub fn spawn_sweeper(&self) -> Option<JoinHandle<()>> {
        let ttl = self.config.idle_ttl?;
        let period = (ttl / 2).max(Duration::from_secs(1));
        let registry = self.clone();
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = registry.purge_expired().await;
                if removed > 0 {
                    tracing::info!(removed, "evicted idle chat sessions");
                }
            }
        }))
    }

    /// Number of sessions
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// List session ids
    pub async fn list_session_ids(&self) -> Vec<String> {
        let guard = self.inner.read().await;
        guard.keys().cloned().collect()
    }

    async fn lookup(&self, id: &str) -> Option<Arc<Mutex<Session>>> {
        let guard = self.inner.read().await;
        guard.get(id).map(Arc::clone)
    }
}

// Only called with the map write-locked, so no new handle to an idle
// session can appear while it is inspected. A second strong reference means
// a request holds or is waiting for the session.
fn idle_since(session: &Arc<Mutex<Session>>) -> Option<Instant> {
    if Arc::strong_count(session) > 1 {
        return None;
    }
    session.try_lock().ok().map(|s| s.last_active())
}

/// Returns false when every session is in use.
fn evict_least_recent(sessions: &mut SessionMap) -> bool {
    let oldest = sessions
        .iter()
        .filter_map(|(id, session)| idle_since(session).map(|at| (id, at)))
        .min_by_key(|(_, at)| *at)
        .map(|(id, _)| id.clone());
    match oldest {
        Some(id) => {
            sessions.remove(&id);
            tracing::info!(chat_id = %id, "evicted least recently used chat session");
            true
        }
        None => false,
    }
}
