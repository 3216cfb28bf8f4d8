use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::PgConnectOptions;
use thiserror::Error;

use crate::services::AdmissionWindow;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_DB_HOST: &str = "localhost";
const DEFAULT_DB_PORT: u16 = 5432;
const DEFAULT_DB_USER: &str = "postgres";
const DEFAULT_DB_NAME: &str = "railway";
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_STORE_TIMEOUT_MS: u64 = 3000;
const DEFAULT_WINDOW_MINUTES: i64 = 20;
const DEFAULT_SERVER_HOST: &str = "0.0.0.0";
const DEFAULT_SERVER_PORT: u16 = 5000;
pub(crate) const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:8501";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} has an invalid value '{value}'")]
    Invalid { key: &'static str, value: String },

    #[error("{key} must be greater than zero")]
    NotPositive { key: &'static str },
}

/// Connection parameters for the ticket store.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Full URL; when present it wins over the split fields below.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub name: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> Result<PgConnectOptions, sqlx::Error> {
        match &self.url {
            Some(url) => PgConnectOptions::from_str(url),
            None => Ok(PgConnectOptions::new()
                .host(&self.host)
                .port(self.port)
                .username(&self.user)
                .password(&self.password)
                .database(&self.name)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Prefix for the `qr_url` handed back by `/book`.
    pub public_base_url: String,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::Invalid {
                key: "SERVER_HOST",
                value: self.host.clone(),
            })
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    /// How many minutes before departure a ticket may be validated.
    pub window_minutes: i64,
    /// Upper bound on every single store round trip.
    pub store_timeout: Duration,
    pub allowed_origins: Vec<String>,
    pub production: bool,
    pub expose_internal_errors: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let production = get("RUST_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let port = parse_or(get("SERVER_PORT"), "SERVER_PORT", DEFAULT_SERVER_PORT)?;
        let window_minutes = parse_or(
            get("ADMISSION_WINDOW_MINUTES"),
            "ADMISSION_WINDOW_MINUTES",
            DEFAULT_WINDOW_MINUTES,
        )?;
        if window_minutes <= 0 {
            return Err(ConfigError::NotPositive {
                key: "ADMISSION_WINDOW_MINUTES",
            });
        }
        if window_minutes > AdmissionWindow::MAX_MINUTES {
            return Err(ConfigError::Invalid {
                key: "ADMISSION_WINDOW_MINUTES",
                value: window_minutes.to_string(),
            });
        }

        let store_timeout_ms = parse_or(
            get("STORE_TIMEOUT_MS"),
            "STORE_TIMEOUT_MS",
            DEFAULT_STORE_TIMEOUT_MS,
        )?;
        if store_timeout_ms == 0 {
            return Err(ConfigError::NotPositive {
                key: "STORE_TIMEOUT_MS",
            });
        }

        let max_connections = parse_or(
            get("DB_MAX_CONNECTIONS"),
            "DB_MAX_CONNECTIONS",
            DEFAULT_MAX_CONNECTIONS,
        )?;
        if max_connections == 0 {
            return Err(ConfigError::NotPositive {
                key: "DB_MAX_CONNECTIONS",
            });
        }

        let database = DatabaseConfig {
            url: get("DATABASE_URL"),
            host: get("DB_HOST").unwrap_or_else(|| DEFAULT_DB_HOST.to_string()),
            port: parse_or(get("DB_PORT"), "DB_PORT", DEFAULT_DB_PORT)?,
            user: get("DB_USER").unwrap_or_else(|| DEFAULT_DB_USER.to_string()),
            password: lookup("DB_PASSWORD").unwrap_or_default(),
            name: get("DB_NAME").unwrap_or_else(|| DEFAULT_DB_NAME.to_string()),
            max_connections,
            acquire_timeout: Duration::from_secs(parse_or(
                get("DB_ACQUIRE_TIMEOUT_SECS"),
                "DB_ACQUIRE_TIMEOUT_SECS",
                DEFAULT_ACQUIRE_TIMEOUT_SECS,
            )?),
        };

        let public_base_url = get("PUBLIC_BASE_URL")
            .unwrap_or_else(|| format!("http://localhost:{port}"))
            .trim_end_matches('/')
            .to_string();

        let server = ServerConfig {
            host: get("SERVER_HOST").unwrap_or_else(|| DEFAULT_SERVER_HOST.to_string()),
            port,
            public_base_url,
        };

        let allowed_origins = get("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        // Never echo store diagnostics to callers in production.
        let expose_internal_errors = !production
            && parse_or(
                get("EXPOSE_INTERNAL_ERRORS"),
                "EXPOSE_INTERNAL_ERRORS",
                false,
            )?;

        Ok(Self {
            database,
            server,
            window_minutes,
            store_timeout: Duration::from_millis(store_timeout_ms),
            allowed_origins,
            production,
            expose_internal_errors,
        })
    }

    /// Configuration with every default applied.
    pub fn defaults() -> Self {
        // The default lookup yields no values, so parsing cannot fail.
        Self::from_lookup(|_| None).unwrap_or_else(|_| unreachable!())
    }
}

fn parse_or<T: FromStr>(
    value: Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}
