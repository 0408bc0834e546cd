//! CLI argument definitions for the MediChat server.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

use medichat_core::MedichatConfig;

/// MediChat - healthcare assistant chat server backed by a RAG service.
#[derive(Parser, Debug)]
#[command(name = "medichat", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// API server port.
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,

    /// API server bind address.
    #[arg(long = "host")]
    pub host: Option<String>,

    /// RAG backend query endpoint.
    #[arg(long = "rag-url")]
    pub rag_url: Option<String>,

    /// RAG backend streaming endpoint. Defaults to `<rag-url>/stream` when
    /// only the query endpoint is overridden.
    #[arg(long = "rag-stream-url")]
    pub rag_stream_url: Option<String>,

    /// RAG backend appointment endpoint.
    #[arg(long = "booking-url")]
    pub booking_url: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > MEDICHAT_CONFIG env var > ~/.medichat/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("MEDICHAT_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Apply CLI flags and environment overrides on top of the loaded config.
    pub fn apply(&self, config: &mut MedichatConfig) {
        self.apply_with_env(config, |name| std::env::var(name).ok());
    }

    fn apply_with_env<F>(&self, config: &mut MedichatConfig, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = self
            .port
            .or_else(|| env("MEDICHAT_PORT").and_then(|v| v.parse::<u16>().ok()))
        {
            config.server.port = port;
        }
        if let Some(ref host) = self.host {
            config.server.host = host.clone();
        }
        let query_url = self.rag_url.clone().or_else(|| env("RAG_API_URL"));
        let stream_url = self
            .rag_stream_url
            .clone()
            .or_else(|| env("RAG_STREAM_URL"));
        match (query_url, stream_url) {
            (query, Some(stream)) => {
                if let Some(query) = query {
                    config.upstream.query_url = query;
                }
                config.upstream.stream_url = stream;
            }
            (Some(query), None) => {
                config.upstream.stream_url = format!("{}/stream", query.trim_end_matches('/'));
                config.upstream.query_url = query;
            }
            (None, None) => {}
        }
        if let Some(url) = self.booking_url.clone().or_else(|| env("RAG_BOOKING_URL")) {
            config.upstream.booking_url = url;
        }
        if let Some(ref level) = self.log_level {
            config.general.log_level = level.clone();
        }
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".medichat").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".medichat").join("config.toml");
    }
    PathBuf::from("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_flags_override_config() {
        let args = CliArgs::parse_from([
            "medichat",
            "--port",
            "8080",
            "--host",
            "0.0.0.0",
            "--rag-url",
            "http://rag:5000/api/query",
            "--log-level",
            "debug",
        ]);
        let mut config = MedichatConfig::default();
        args.apply_with_env(&mut config, no_env);

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.upstream.query_url, "http://rag:5000/api/query");
        assert_eq!(config.upstream.stream_url, "http://rag:5000/api/query/stream");
        assert_eq!(config.general.log_level, "debug");
        // Untouched values keep their defaults.
        assert_eq!(
            config.upstream.booking_url,
            MedichatConfig::default().upstream.booking_url
        );
    }

    #[test]
    fn test_env_used_when_flag_absent() {
        let args = CliArgs::parse_from(["medichat"]);
        let mut config = MedichatConfig::default();
        args.apply_with_env(&mut config, |name| match name {
            "MEDICHAT_PORT" => Some("4000".to_string()),
            "RAG_API_URL" => Some("http://env-rag/api/query".to_string()),
            "RAG_BOOKING_URL" => Some("http://env-rag/api/book-appointment".to_string()),
            _ => None,
        });

        assert_eq!(config.server.port, 4000);
        assert_eq!(config.upstream.query_url, "http://env-rag/api/query");
        assert_eq!(config.upstream.stream_url, "http://env-rag/api/query/stream");
        assert_eq!(
            config.upstream.booking_url,
            "http://env-rag/api/book-appointment"
        );
    }

    #[test]
    fn test_explicit_stream_url_wins() {
        let args = CliArgs::parse_from([
            "medichat",
            "--rag-url",
            "http://rag:5000/api/query",
            "--rag-stream-url",
            "http://rag:5000/api/chat/stream",
        ]);
        let mut config = MedichatConfig::default();
        args.apply_with_env(&mut config, no_env);
        assert_eq!(config.upstream.query_url, "http://rag:5000/api/query");
        assert_eq!(config.upstream.stream_url, "http://rag:5000/api/chat/stream");

        let args = CliArgs::parse_from(["medichat"]);
        let mut config = MedichatConfig::default();
        args.apply_with_env(&mut config, |name| {
            (name == "RAG_STREAM_URL").then(|| "http://env-rag/stream".to_string())
        });
        assert_eq!(config.upstream.stream_url, "http://env-rag/stream");
        assert_eq!(
            config.upstream.query_url,
            MedichatConfig::default().upstream.query_url
        );
    }

    #[test]
    fn test_flag_beats_env() {
        let args = CliArgs::parse_from(["medichat", "-p", "9000"]);
        let mut config = MedichatConfig::default();
        args.apply_with_env(&mut config, |name| {
            (name == "MEDICHAT_PORT").then(|| "4000".to_string())
        });
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_unparseable_env_port_is_ignored() {
        let args = CliArgs::parse_from(["medichat"]);
        let mut config = MedichatConfig::default();
        args.apply_with_env(&mut config, |name| {
            (name == "MEDICHAT_PORT").then(|| "not-a-port".to_string())
        });
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_explicit_config_path() {
        let args = CliArgs::parse_from(["medichat", "--config", "/etc/medichat.toml"]);
        assert_eq!(args.resolve_config_path(), PathBuf::from("/etc/medichat.toml"));
    }
}
