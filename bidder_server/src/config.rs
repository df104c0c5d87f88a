//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use bidder::db::DatabaseConfig;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

/// Bind address used when neither `--bind` nor `SERVER_BIND` is given
pub const DEFAULT_BIND: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080);

/// Where the ledger keeps its rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(ConfigError::Invalid {
                var: "LEDGER_STORE".to_string(),
                reason: format!("Unknown store '{other}', expected 'postgres' or 'memory'"),
            }),
        }
    }
}

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Database configuration, only used by the PostgreSQL backend
    pub database: DatabaseConfig,
    /// Ledger store backend
    pub store: StoreBackend,
    /// Apply schema migrations on startup
    pub run_migrations: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `database_url_override` - Optional database URL override (from CLI args)
    /// * `memory` - Force the in-memory store (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if a variable is present but invalid
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
        memory: bool,
    ) -> Result<Self, ConfigError> {
        Self::from_vars(
            |key| std::env::var(key).ok(),
            bind_override,
            database_url_override,
            memory,
        )
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_vars(
        lookup: impl Fn(&str) -> Option<String>,
        bind_override: Option<SocketAddr>,
        database_url_override: Option<String>,
        memory: bool,
    ) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key);

        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_var(&var, "SERVER_BIND")?.unwrap_or(DEFAULT_BIND),
        };

        let defaults = DatabaseConfig::development();
        let database = DatabaseConfig {
            database_url: database_url_override
                .or_else(|| var("DATABASE_URL"))
                .unwrap_or(defaults.database_url),
            max_connections: parse_var(&var, "DB_MAX_CONNECTIONS")?
                .unwrap_or(defaults.max_connections),
            min_connections: parse_var(&var, "DB_MIN_CONNECTIONS")?
                .unwrap_or(defaults.min_connections),
            connection_timeout_secs: parse_var(&var, "DB_CONNECTION_TIMEOUT")?
                .unwrap_or(defaults.connection_timeout_secs),
            idle_timeout_secs: parse_var(&var, "DB_IDLE_TIMEOUT")?
                .unwrap_or(defaults.idle_timeout_secs),
            max_lifetime_secs: parse_var(&var, "DB_MAX_LIFETIME")?
                .unwrap_or(defaults.max_lifetime_secs),
        };

        let store = if memory {
            StoreBackend::Memory
        } else {
            parse_var(&var, "LEDGER_STORE")?.unwrap_or(StoreBackend::Postgres)
        };

        let run_migrations = parse_var(&var, "RUN_MIGRATIONS")?.unwrap_or(true);

        let config = ServerConfig {
            bind,
            database,
            store,
            run_migrations,
        };
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store == StoreBackend::Memory {
            return Ok(());
        }

        if self.database.database_url.is_empty() {
            return Err(ConfigError::Invalid {
                var: "DATABASE_URL".to_string(),
                reason: "Must not be empty".to_string(),
            });
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid {
                var: "DB_MAX_CONNECTIONS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::Invalid {
                var: "DB_MIN_CONNECTIONS".to_string(),
                reason: format!(
                    "Cannot exceed max connections ({})",
                    self.database.max_connections
                ),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Parse a variable, treating an unset one as `None`
fn parse_var<T>(var: impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(key) {
        Some(raw) => raw.parse().map(Some).map_err(|e: T::Err| ConfigError::Invalid {
            var: key.to_string(),
            reason: format!("'{raw}': {e}"),
        }),
        None => Ok(None),
    }
}
