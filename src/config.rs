// src/config.rs
use std::str::FromStr;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::services::gemini::{DEFAULT_API_BASE, DEFAULT_MODEL};
use crate::services::session_manager::RegistryConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY is missing in environment variables")]
    MissingApiKey,

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Process configuration, read once at startup.
#[derive(Clone)]
pub struct Config {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    pub model_timeout: Duration,
    pub host: String,
    pub port: u16,
    pub sessions: RegistryConfig,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("model", &self.model)
            .field("api_base", &self.api_base)
            .field("model_timeout", &self.model_timeout)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("sessions", &self.sessions)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let api_key = get("GEMINI_API_KEY").ok_or(ConfigError::MissingApiKey)?;

        let timeout_secs: u64 = parse(&get, "MODEL_TIMEOUT_SECS")?.unwrap_or(120);
        let capacity: Option<usize> = parse(&get, "SESSION_CAPACITY")?.filter(|c| *c > 0);
        let idle_ttl = parse::<u64, _>(&get, "SESSION_IDLE_TTL_SECS")?.map(Duration::from_secs);

        Ok(Self {
            api_key,
            model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_base: get("GEMINI_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            model_timeout: Duration::from_secs(timeout_secs),
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse(&get, "PORT")?.unwrap_or(5001),
            sessions: RegistryConfig { capacity, idle_ttl },
        })
    }

    /// Binds the listen socket; `HOST` may be a name such as `localhost` or an IPv6 address.
    pub async fn bind_listener(&self) -> std::io::Result<TcpListener> {
        TcpListener::bind((self.host.as_str(), self.port)).await
    }
}

fn parse<T, G>(get: &G, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn missing_key_is_fatal() {
        assert!(matches!(load(&[]), Err(ConfigError::MissingApiKey)));
        assert!(matches!(load(&[("GEMINI_API_KEY", "  ")]), Err(ConfigError::MissingApiKey)));
    }

    #[test]
    fn defaults() {
        let cfg = load(&[("GEMINI_API_KEY", "k")]).unwrap();
        assert_eq!(cfg.model, "gemini-1.5-flash");
        assert_eq!(cfg.port, 5001);
        assert_eq!(cfg.model_timeout, Duration::from_secs(120));
        assert!(cfg.sessions.capacity.is_none());
        assert!(cfg.sessions.idle_ttl.is_none());
        assert_eq!(cfg.host, "0.0.0.0");
    }

    #[test]
    fn eviction_settings() {
        let cfg = load(&[
            ("GEMINI_API_KEY", "k"),
            ("SESSION_CAPACITY", "100"),
            ("SESSION_IDLE_TTL_SECS", "600"),
        ])
        .unwrap();
        assert_eq!(cfg.sessions.capacity, Some(100));
        assert_eq!(cfg.sessions.idle_ttl, Some(Duration::from_secs(600)));

        let cfg = load(&[("GEMINI_API_KEY", "k"), ("SESSION_CAPACITY", "0")]).unwrap();
        assert!(cfg.sessions.capacity.is_none());
    }

    #[test]
    fn bad_number_names_the_variable() {
        let err = load(&[("GEMINI_API_KEY", "k"), ("PORT", "abc")]).unwrap_err();
        assert_eq!(err.to_string(), "invalid value for PORT: \"abc\"");
    }

    #[tokio::test]
    async fn binds_to_hostnames() {
        let cfg = load(&[("GEMINI_API_KEY", "k"), ("HOST", "localhost"), ("PORT", "0")]).unwrap();
        let listener = cfg.bind_listener().await.unwrap();
        assert!(listener.local_addr().unwrap().ip().is_loopback());

        let cfg = load(&[("GEMINI_API_KEY", "k"), ("HOST", "127.0.0.1"), ("PORT", "0")]).unwrap();
        assert!(cfg.bind_listener().await.is_ok());
    }

    #[test]
    fn debug_hides_api_key() {
        let cfg = load(&[("GEMINI_API_KEY", "super-secret")]).unwrap();
        assert!(!format!("{cfg:?}").contains("super-secret"));
    }
}
