//! Typed configuration from environment variables.
//!
//! Loads once at startup, fails fast if a value is present but invalid.
//! Sensitive values wrapped in secrecy::SecretString to prevent log leaks.

pub mod secrets;

use std::time::Duration;

use crate::error::{Error, Result};
use redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use secrecy::{ExposeSecret, SecretString};

const DEFAULT_REDIS_PORT: u16 = 6379;

/// Which score store backs the queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Redis,
    Postgres,
    Memory,
}

impl std::str::FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "redis" => Ok(Backend::Redis),
            "postgres" | "postgresql" => Ok(Backend::Postgres),
            "memory" => Ok(Backend::Memory),
            other => Err(Error::Config(format!("unknown STORE_BACKEND {other:?}"))),
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Backend::Redis => "redis",
            Backend::Postgres => "postgres",
            Backend::Memory => "memory",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug)]
pub struct Config {
    pub backend: Backend,
    /// `host:port` or a full `redis://` URL.
    pub redis_address: String,
    pub redis_password: Option<SecretString>,
    pub redis_database: i64,
    pub database_url: Option<SecretString>,
    pub bind_address: String,
    /// Per-call store timeout. None disables it.
    pub store_timeout: Option<Duration>,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// In local dev, call `dotenvy::dotenv().ok()` before this.
    pub fn from_env() -> Result<Self> {
        let backend = match optional_var("STORE_BACKEND") {
            Some(s) => s.parse()?,
            None => Backend::Redis,
        };

        let redis_database = match optional_var("REDIS_DATABASE") {
            Some(s) => s.parse().map_err(|_| {
                Error::Config(format!("REDIS_DATABASE must be an integer, got {s:?}"))
            })?,
            None => 0,
        };

        let store_timeout = match optional_var("STORE_TIMEOUT_MS") {
            Some(s) => {
                let ms: u64 = s.parse().map_err(|_| {
                    Error::Config(format!("STORE_TIMEOUT_MS must be an integer, got {s:?}"))
                })?;
                (ms > 0).then(|| Duration::from_millis(ms))
            }
            None => None,
        };

        let config = Self {
            backend,
            redis_address: optional_var("REDIS_URL").unwrap_or_else(|| "127.0.0.1:6379".to_string()),
            redis_password: optional_var("REDIS_PASSWORD").map(SecretString::from),
            redis_database,
            database_url: optional_var("DATABASE_URL").map(SecretString::from),
            bind_address: normalize_bind_address(
                &optional_var("BIND_ADDRESS").unwrap_or_else(|| ":8080".to_string()),
            ),
            store_timeout,
            otel_endpoint: optional_var("OTEL_ENDPOINT"),
            log_level: optional_var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        };

        if config.backend == Backend::Postgres {
            config.postgres_url()?;
        }
        Ok(config)
    }

    /// Postgres connection URL, required for the postgres backend.
    pub fn postgres_url(&self) -> Result<&str> {
        self.database_url
            .as_ref()
            .map(|url| url.expose_secret())
            .ok_or_else(|| {
                Error::Config("required environment variable DATABASE_URL is not set".to_string())
            })
    }

    /// Redis connection settings from address, password and database.
    ///
    /// A `REDIS_URL` that is already a URL is parsed as is. Otherwise the
    /// password is handed to the client verbatim, never through a URL, so
    /// any byte sequence works.
    pub fn redis_connection_info(&self) -> Result<ConnectionInfo> {
        let address = self.redis_address.as_str();
        if address.starts_with("redis://")
            || address.starts_with("rediss://")
            || address.starts_with("redis+unix://")
        {
            return address
                .parse()
                .map_err(|e| Error::Config(format!("invalid REDIS_URL: {e}")));
        }

        let (host, port) = match address.rsplit_once(':') {
            Some((host, port)) => {
                let port = port.parse().map_err(|_| {
                    Error::Config(format!("invalid port in REDIS_URL {address:?}"))
                })?;
                (host, port)
            }
            None => (address, DEFAULT_REDIS_PORT),
        };
        let host = host.trim_start_matches('[').trim_end_matches(']');

        Ok(ConnectionInfo {
            addr: ConnectionAddr::Tcp(host.to_string(), port),
            redis: RedisConnectionInfo {
                db: self.redis_database,
                password: self
                    .redis_password
                    .as_ref()
                    .map(|p| p.expose_secret().to_string()),
                ..Default::default()
            },
        })
    }
}

/// `:8080` means every interface, as Go-style listeners accept it.
pub fn normalize_bind_address(address: &str) -> String {
    if address.starts_with(':') {
        format!("0.0.0.0{address}")
    } else {
        address.to_string()
    }
}

/// Unset and empty are treated the same.
fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}
