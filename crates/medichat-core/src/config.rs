use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{MedichatError, Result};

/// Top-level configuration for the MediChat service.
///
/// Loaded from `~/.medichat/config.toml` by default. Every section falls back
/// to its defaults when omitted, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MedichatConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl MedichatConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read, parsed, or fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: MedichatConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Reject values the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.server.rate_limit_per_sec == 0 {
            return Err(MedichatError::Config(
                "server.rate_limit_per_sec must be greater than zero".to_string(),
            ));
        }
        if self.upstream.timeout_secs == 0 {
            return Err(MedichatError::Config(
                "upstream.timeout_secs must be greater than zero".to_string(),
            ));
        }
        for (name, url) in [
            ("upstream.query_url", &self.upstream.query_url),
            ("upstream.stream_url", &self.upstream.stream_url),
            ("upstream.booking_url", &self.upstream.booking_url),
        ] {
            if url.trim().is_empty() {
                return Err(MedichatError::Config(format!("{} must not be empty", name)));
            }
        }
        if self.chat.max_message_length == 0 {
            return Err(MedichatError::Config(
                "chat.max_message_length must be greater than zero".to_string(),
            ));
        }
        if self.chat.session_timeout_minutes == 0 {
            return Err(MedichatError::Config(
                "chat.session_timeout_minutes must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Requests allowed per second across the rate-limited routes.
    pub rate_limit_per_sec: u64,
    /// Maximum accepted request body size.
    pub body_limit_bytes: usize,
    /// Origins allowed by CORS. Empty means same-origin only.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            rate_limit_per_sec: 100,
            body_limit_bytes: 64 * 1024,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

/// Endpoints of the external RAG backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Question answering endpoint, returns `{ "answer": ... }`.
    pub query_url: String,
    /// Streaming variant of the query endpoint, returns raw text chunks.
    pub stream_url: String,
    /// Appointment booking endpoint.
    pub booking_url: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            query_url: "http://127.0.0.1:5000/api/query".to_string(),
            stream_url: "http://127.0.0.1:5000/api/query/stream".to_string(),
            booking_url: "http://127.0.0.1:5000/api/book-appointment".to_string(),
            timeout_secs: 25,
        }
    }
}

/// Conversation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Maximum user message length in characters.
    pub max_message_length: usize,
    /// Idle minutes after which a conversation is dropped.
    pub session_timeout_minutes: u32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_message_length: 2000,
            session_timeout_minutes: 30,
        }
    }
}
