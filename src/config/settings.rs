//! Application settings loaded from environment variables.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use super::constants::{
    DEFAULT_BASE_PATH, DEFAULT_DATABASE_URL, DEFAULT_SERVER_HOST, DEFAULT_SERVER_PORT,
    DEFAULT_STORE_BACKEND, DEFAULT_STORE_RETRY_ATTEMPTS, DEFAULT_STORE_RETRY_DELAY_MS,
    DEFAULT_STORE_TIMEOUT_MS,
};

/// Which document store driver backs the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Memory,
    Postgres,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "mem" => Ok(StoreBackend::Memory),
            "postgres" | "postgresql" | "pg" => Ok(StoreBackend::Postgres),
            other => Err(format!("unknown store backend '{}'", other)),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreBackend::Memory => write!(f, "memory"),
            StoreBackend::Postgres => write!(f, "postgres"),
        }
    }
}

/// Application configuration
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub store_backend: StoreBackend,
    pub schema_path: Option<String>,
    pub base_path: String,
    pub server_host: String,
    pub server_port: u16,
    pub store_timeout_ms: u64,
    pub store_retry_attempts: u32,
    pub store_retry_delay_ms: u64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("store_backend", &self.store_backend)
            .field("schema_path", &self.schema_path)
            .field("base_path", &self.base_path)
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("store_timeout_ms", &self.store_timeout_ms)
            .field("store_retry_attempts", &self.store_retry_attempts)
            .field("store_retry_delay_ms", &self.store_retry_delay_ms)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            store_backend: StoreBackend::Memory,
            schema_path: None,
            base_path: DEFAULT_BASE_PATH.to_string(),
            server_host: DEFAULT_SERVER_HOST.to_string(),
            server_port: DEFAULT_SERVER_PORT,
            store_timeout_ms: DEFAULT_STORE_TIMEOUT_MS,
            store_retry_attempts: DEFAULT_STORE_RETRY_ATTEMPTS,
            store_retry_delay_ms: DEFAULT_STORE_RETRY_DELAY_MS,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Unparseable values fall back to their defaults with a warning.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let store_backend = env::var("STORE_BACKEND")
            .unwrap_or_else(|_| DEFAULT_STORE_BACKEND.to_string())
            .parse()
            .unwrap_or_else(|e| {
                tracing::warn!("{}, falling back to {}", e, DEFAULT_STORE_BACKEND);
                StoreBackend::Memory
            });

        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
            store_backend,
            schema_path: env::var("SCHEMA_PATH").ok().filter(|p| !p.trim().is_empty()),
            base_path: normalize_base_path(
                &env::var("API_BASE_PATH").unwrap_or_else(|_| DEFAULT_BASE_PATH.to_string()),
            ),
            server_host: env::var("SERVER_HOST")
                .unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
            server_port: parse_or("SERVER_PORT", DEFAULT_SERVER_PORT),
            store_timeout_ms: parse_or("STORE_TIMEOUT_MS", DEFAULT_STORE_TIMEOUT_MS),
            store_retry_attempts: parse_or("STORE_RETRY_ATTEMPTS", DEFAULT_STORE_RETRY_ATTEMPTS)
                .max(1),
            store_retry_delay_ms: parse_or("STORE_RETRY_DELAY_MS", DEFAULT_STORE_RETRY_DELAY_MS),
        }
    }

    /// Get the full server address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Per-call store timeout.
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// Base delay between store retries.
    pub fn store_retry_delay(&self) -> Duration {
        Duration::from_millis(self.store_retry_delay_ms)
    }
}

fn parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr + fmt::Display + Copy,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("{}='{}' is not valid, using {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

/// Normalize a route prefix to `""` or `/segment[/segment...]` without a trailing slash.
pub fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}
