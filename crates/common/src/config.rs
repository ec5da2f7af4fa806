//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Poll store selection.
    #[serde(default)]
    pub store: StoreConfig,
    /// Database configuration, required by the database store.
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    /// Voting policy.
    #[serde(default)]
    pub voting: VotingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Which poll store backs the services.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local store; state is lost on restart.
    #[default]
    Memory,
    /// `PostgreSQL` through sea-orm.
    Database,
}

/// Poll store configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    /// Selected backend.
    #[serde(default)]
    pub backend: StoreBackend,
}

/// Database connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Voting policy configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct VotingConfig {
    /// Reject a second submission from the same voter on a poll.
    #[serde(default = "default_true")]
    pub prevent_duplicate_votes: bool,
    /// Accept submissions that carry no voter identity.
    #[serde(default = "default_true")]
    pub allow_anonymous_votes: bool,
    /// Maximum number of options a poll may be created with.
    #[serde(default = "default_max_options")]
    pub max_options: usize,
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            prevent_duplicate_votes: true,
            allow_anonymous_votes: true,
            max_options: default_max_options(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    3000
}

const fn default_max_connections() -> u32 {
    100
}

const fn default_min_connections() -> u32 {
    5
}

const fn default_max_options() -> usize {
    10
}

const fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `BALLOT_ENV`)
    /// 3. Environment variables with `BALLOT_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("BALLOT_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("BALLOT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("BALLOT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Database settings, or a configuration error when the database
    /// backend is selected without them.
    pub fn database(&self) -> Result<&DatabaseConfig, config::ConfigError> {
        self.database
            .as_ref()
            .ok_or_else(|| config::ConfigError::NotFound("database".to_string()))
    }
}
