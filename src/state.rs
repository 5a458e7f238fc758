// src/state.rs
use std::sync::Arc;

use crate::services::{
    model::ModelBackend,
    session_manager::{RegistryConfig, SessionRegistry},
};

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub sessions: SessionRegistry,
    pub api_key_configured: bool,
}

impl AppState {
    pub fn new(backend: Arc<dyn ModelBackend>, config: RegistryConfig, api_key_configured: bool) -> Self {
        Self {
            sessions: SessionRegistry::new(backend, config),
            api_key_configured,
        }
    }
}
