#![allow(clippy::must_use_candidate)]

mod env;
mod loader;
pub mod models;

use secrecy::SecretString;
use serde::Deserialize;

pub use models::{ModelCatalog, ModelConfig, ModelKind};

/// Top-level transit configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// PostgreSQL connection parameters
    pub database: DatabaseConfig,
    /// Redis connection for the counter and balance stores
    pub redis: RedisConfig,
    /// Admin surface configuration
    pub admin: AdminConfig,
    /// Background reconciliation loop
    #[serde(default)]
    pub poller: PollerConfig,
    /// Model catalog with per-model pricing
    #[serde(default)]
    pub models: ModelCatalog,
}

/// Deployment environment
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub environment: Environment,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            environment: Environment::default(),
        }
    }
}

const fn default_port() -> u16 {
    8080
}

/// PostgreSQL DSN components
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    pub host: String,
    #[serde(default = "default_db_port")]
    pub port: u16,
    pub user: String,
    pub password: SecretString,
    pub dbname: String,
    #[serde(default = "default_sslmode")]
    pub sslmode: String,
}

const fn default_db_port() -> u16 {
    5432
}

fn default_sslmode() -> String {
    "disable".to_owned()
}

impl DatabaseConfig {
    /// Assemble the components into a connection string
    pub fn dsn(&self) -> String {
        use secrecy::ExposeSecret;
        format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            self.user,
            self.password.expose_secret(),
            self.host,
            self.port,
            self.dbname,
            self.sslmode,
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedisConfig {
    /// Connection URL, e.g. `redis://127.0.0.1:6379/0`
    pub url: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdminConfig {
    /// Shared secret expected in the `X-Admin-Token` header
    pub token: SecretString,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PollerConfig {
    /// Seconds between reconciliation sweeps
    #[serde(default = "default_poll_interval")]
    pub interval_secs: u64,
    /// Maximum running tasks examined per sweep
    #[serde(default = "default_batch_size")]
    pub batch_size: i64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_poll_interval(),
            batch_size: default_batch_size(),
        }
    }
}

const fn default_poll_interval() -> u64 {
    10
}

const fn default_batch_size() -> i64 {
    100
}
