//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use std::net::SocketAddr;
use std::str::FromStr;

pub use tourney::config::ConfigError;
use tourney::config::{CompetitionConfig, env_or};
use tourney::db::DatabaseConfig;
use tourney::events::DEFAULT_EVENT_BUFFER;

/// Default HTTP bind address
pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

/// Shortest accepted JWT secret
pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Where tournament data lives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Postgres,
    Memory,
}

impl FromStr for StorageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StorageKind::Postgres),
            "memory" => Ok(StorageKind::Memory),
            other => Err(format!("unknown storage '{other}'")),
        }
    }
}

/// Storage backend with its settings
#[derive(Debug, Clone)]
pub enum Storage {
    Postgres(DatabaseConfig),
    /// Process-local store; data is lost on restart
    Memory,
}

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    pub storage: Storage,
    pub security: SecurityConfig,
    /// Prometheus scrape address; metrics are off when unset
    pub metrics_bind: Option<SocketAddr>,
    /// Events buffered per realtime subscriber
    pub event_buffer: usize,
    pub competition: CompetitionConfig,
}

/// Security-related configuration
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Shared HS256 secret of the identity provider (required)
    pub jwt_secret: String,
    /// Expected `aud` claim, checked only when set
    pub jwt_audience: Option<String>,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `storage_override` - Optional storage override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if required variables are missing or invalid
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        storage_override: Option<StorageKind>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => env_or("SERVER_BIND", default_bind())?,
        };

        let storage_kind = match storage_override {
            Some(kind) => kind,
            None => env_or("STORAGE", StorageKind::Postgres)?,
        };
        let storage = match storage_kind {
            StorageKind::Postgres => Storage::Postgres(DatabaseConfig::from_env()?),
            StorageKind::Memory => Storage::Memory,
        };

        let jwt_secret = std::env::var("JWT_SECRET").map_err(|_| ConfigError::MissingRequired {
            var: "JWT_SECRET".to_string(),
            hint: "Use the identity provider's JWT signing secret".to_string(),
        })?;
        let jwt_audience = std::env::var("JWT_AUDIENCE")
            .ok()
            .filter(|aud| !aud.trim().is_empty());

        let metrics_bind = match std::env::var("METRICS_BIND") {
            Ok(raw) if !raw.trim().is_empty() => Some(raw.trim().parse().map_err(|_| {
                ConfigError::invalid("METRICS_BIND", format!("'{raw}' is not a socket address"))
            })?),
            _ => None,
        };

        let config = ServerConfig {
            bind,
            storage,
            security: SecurityConfig {
                jwt_secret,
                jwt_audience,
            },
            metrics_bind,
            event_buffer: env_or("EVENT_BUFFER", DEFAULT_EVENT_BUFFER)?,
            competition: CompetitionConfig::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::invalid(
                "JWT_SECRET",
                format!("Must be at least {MIN_JWT_SECRET_LEN} characters"),
            ));
        }

        if self.event_buffer == 0 {
            return Err(ConfigError::invalid("EVENT_BUFFER", "Must be greater than 0"));
        }

        if self.metrics_bind == Some(self.bind) {
            return Err(ConfigError::invalid(
                "METRICS_BIND",
                "Must differ from SERVER_BIND",
            ));
        }

        if let Storage::Postgres(database) = &self.storage {
            database.validate()?;
        }
        self.competition.validate()
    }
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}
