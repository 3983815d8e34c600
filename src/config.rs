//! Process configuration
//!
//! Read once from the environment at startup and handed to constructors.
//! Nothing here is mutated after boot.

use crate::error::ChatError;
use crate::Result;
use std::env;
use std::path::PathBuf;
use tracing::warn;

pub const DEFAULT_GATEWAY_PORT: u16 = 8080;
pub const DEFAULT_PROXY_PORT: u16 = 8081;
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_PROXY_URL: &str = "http://127.0.0.1:8081";

/// Configuration for the memory store proxy.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub port: u16,
    /// Postgres connection string; `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub max_connections: u32,
}

impl ProxyConfig {
    pub fn from_env() -> Result<Self> {
        let port = parse_port(env::var("PORT").ok(), DEFAULT_PROXY_PORT)?;

        let database_url = env::var("DATABASE_URL")
            .or_else(|_| env::var("POSTGRES_URL"))
            .ok()
            .filter(|url| !url.trim().is_empty());

        let max_connections = match env::var("DB_MAX_CONNECTIONS") {
            Ok(raw) => raw.parse().map_err(|_| {
                ChatError::Config(format!("DB_MAX_CONNECTIONS is not a number: {}", raw))
            })?,
            Err(_) => 5,
        };

        Ok(Self {
            port,
            database_url,
            max_connections,
        })
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PROXY_PORT,
            database_url: None,
            max_connections: 5,
        }
    }
}

/// Configuration for the conversation gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub port: u16,
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub speech_api_key: String,
    /// Base URL of the memory store proxy, without trailing slash.
    pub memory_proxy_url: String,
    pub static_dir: PathBuf,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self> {
        let port = parse_port(env::var("PORT").ok(), DEFAULT_GATEWAY_PORT)?;

        let gemini_api_key = env::var("GEMINI_API_KEY").unwrap_or_default();
        if gemini_api_key.is_empty() {
            warn!("GEMINI_API_KEY not set; every reply will fall back to the apology text");
        }

        let speech_api_key = env::var("SPEECH_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| gemini_api_key.clone());

        let memory_proxy_url = env::var("MCP_SERVER_URL")
            .unwrap_or_else(|_| DEFAULT_PROXY_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            port,
            gemini_api_key,
            gemini_model: env::var("GEMINI_MODEL")
                .unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string()),
            speech_api_key,
            memory_proxy_url,
            static_dir: env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
        })
    }
}

fn parse_port(raw: Option<String>, default: u16) -> Result<u16> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ChatError::Config(format!("PORT is not a valid port: {}", value))),
        None => Ok(default),
    }
}
