// src/services/mod.rs
pub mod gemini;
pub mod model;
pub mod prompt;
pub mod session_manager;
