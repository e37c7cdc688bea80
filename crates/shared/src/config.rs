//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
///
/// The configuration store (calculations, report templates, audit log) and the
/// warehouse are separate databases and get separate connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Configuration store database.
    pub config_database: DatabaseConfig,
    /// Warehouse database (read-only for the engine).
    pub warehouse_database: DatabaseConfig,
    /// Query execution settings.
    #[serde(default)]
    pub query: QuerySettings,
    /// Audit writer settings.
    #[serde(default)]
    pub audit: AuditSettings,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Report query execution settings.
#[derive(Debug, Clone, Deserialize)]
pub struct QuerySettings {
    /// Upper bound for a single warehouse statement.
    #[serde(default = "default_statement_timeout")]
    pub statement_timeout_secs: u64,
    /// Whether SQL calculations are compiled against the warehouse before use.
    #[serde(default = "default_validate_raw_sql")]
    pub validate_raw_sql: bool,
}

fn default_statement_timeout() -> u64 {
    60
}

fn default_validate_raw_sql() -> bool {
    true
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            statement_timeout_secs: default_statement_timeout(),
            validate_raw_sql: default_validate_raw_sql(),
        }
    }
}

/// Audit writer settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditSettings {
    /// Buffered entries that trigger an immediate flush.
    #[serde(default = "default_audit_batch_size")]
    pub batch_size: usize,
    /// Interval of the background flush ticker.
    #[serde(default = "default_audit_flush_interval")]
    pub flush_interval_secs: u64,
}

fn default_audit_batch_size() -> usize {
    50
}

fn default_audit_flush_interval() -> u64 {
    5
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            batch_size: default_audit_batch_size(),
            flush_interval_secs: default_audit_flush_interval(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("VANTAGE").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
