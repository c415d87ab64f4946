//! Centralized server configuration.
//!
//! Loaded via the `config` crate from environment variables. Nested keys
//! use `__` as separator (`SCHEDULER__RECONCILE_ON_STARTUP`).

use serde::Deserialize;

/// Server configuration.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// PostgreSQL database connection URL.
    pub database_url: String,

    /// Address the HTTP listener binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Maximum size of the database connection pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Scheduler configuration.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// Scheduler-related configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Re-arm stored scheduled triggers that have not fired yet on startup.
    #[serde(default = "default_reconcile_on_startup")]
    pub reconcile_on_startup: bool,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_reconcile_on_startup() -> bool {
    true
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            reconcile_on_startup: default_reconcile_on_startup(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
