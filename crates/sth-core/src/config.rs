//! Configuration structures for the scenario test helper.
//!
//! Configuration is loaded from TOML files and can be overridden via CLI flags.

use crate::status::StatusSet;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::time::Duration;

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Cluster under test
    pub cluster: ClusterConfig,

    /// Execution engine settings
    #[serde(default)]
    pub execution: ExecutionConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Cluster under test.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClusterConfig {
    /// Endpoint the driver connects to
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Root database name, without the leading slash
    pub database: String,

    /// Optional prefix under the database where test objects are created
    #[serde(default)]
    pub tables_path: String,
}

impl ClusterConfig {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            endpoint: default_endpoint(),
            database: database.into(),
            tables_path: String::new(),
        }
    }

    /// Set the tables path prefix.
    pub fn with_tables_path(mut self, tables_path: impl Into<String>) -> Self {
        self.tables_path = tables_path.into();
        self
    }
}

/// Execution engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExecutionConfig {
    /// Fixed delay between attempts in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Rows requested from a data generator per bulk-load call
    #[serde(default = "default_bulk_upsert_batch_size")]
    pub bulk_upsert_batch_size: NonZeroUsize,

    /// Network timeout for scan queries in seconds
    #[serde(default)]
    pub scan_timeout_seconds: Option<u64>,

    /// Statuses retried by schema queries when the caller gives none
    #[serde(default = "StatusSet::default_retriable")]
    pub retriable_statuses: StatusSet,
}

impl ExecutionConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn scan_timeout(&self) -> Option<Duration> {
        self.scan_timeout_seconds.map(Duration::from_secs)
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            retry_delay_ms: default_retry_delay_ms(),
            bulk_upsert_batch_size: default_bulk_upsert_batch_size(),
            scan_timeout_seconds: None,
            retriable_statuses: StatusSet::default_retriable(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log format
    #[serde(default)]
    pub log_format: LogFormat,
}

/// Log level.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level
    Trace,
    /// Debug level
    Debug,
    /// Info level (default)
    #[default]
    Info,
    /// Warn level
    Warn,
    /// Error level
    Error,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log format.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Plain text format (default, readable in test output)
    #[default]
    Text,
}

// Default value functions

fn default_endpoint() -> String {
    "grpc://localhost:2135".to_string()
}

fn default_retry_delay_ms() -> u64 {
    3000
}

fn default_bulk_upsert_batch_size() -> NonZeroUsize {
    NonZeroUsize::new(1000).unwrap_or(NonZeroUsize::MIN)
}

impl Config {
    /// Configuration for `database` with every other setting defaulted.
    pub fn for_database(database: impl Into<String>) -> Self {
        Self {
            cluster: ClusterConfig::new(database),
            execution: ExecutionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &std::path::Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> crate::Result<()> {
        if self.cluster.database.trim_matches('/').is_empty() {
            return Err(crate::Error::Config("Database name is required".into()));
        }

        if self.cluster.endpoint.is_empty() {
            return Err(crate::Error::Config("Cluster endpoint is required".into()));
        }

        if self.execution.retry_delay_ms == 0 {
            tracing::warn!("Zero retry delay: retriable statuses will be retried back to back");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::StatusCode;
    use std::io::Write;

    #[test]
    fn test_default_execution_config() {
        let config = ExecutionConfig::default();
        assert_eq!(config.retry_delay(), Duration::from_secs(3));
        assert_eq!(config.bulk_upsert_batch_size.get(), 1000);
        assert_eq!(config.retriable_statuses, StatusSet::default_retriable());
        assert!(config.scan_timeout().is_none());
    }

    #[test]
    fn test_minimal_config() {
        let config = Config::from_toml_str(
            r#"
            [cluster]
            database = "local"
            "#,
        )
        .unwrap();

        assert_eq!(config.cluster.database, "local");
        assert_eq!(config.cluster.endpoint, "grpc://localhost:2135");
        assert!(config.cluster.tables_path.is_empty());
        assert_eq!(config.logging.log_format, LogFormat::Text);
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_toml_str(
            r#"
            [cluster]
            endpoint = "grpc://ydb:2136"
            database = "Root/test"
            tables_path = "olap_yatests"

            [execution]
            retry_delay_ms = 10
            bulk_upsert_batch_size = 500
            scan_timeout_seconds = 60
            retriable_statuses = ["overloaded", "unavailable"]

            [logging]
            log_level = "debug"
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.cluster.tables_path, "olap_yatests");
        assert_eq!(config.execution.bulk_upsert_batch_size.get(), 500);
        assert_eq!(config.execution.retry_delay(), Duration::from_millis(10));
        assert_eq!(config.execution.scan_timeout(), Some(Duration::from_secs(60)));
        assert!(config
            .execution
            .retriable_statuses
            .contains(StatusCode::Unavailable));
        assert!(!config
            .execution
            .retriable_statuses
            .contains(StatusCode::BadSession));
        assert_eq!(config.logging.log_level, LogLevel::Debug);
        assert_eq!(config.logging.log_format, LogFormat::Json);
    }

    #[test]
    fn test_config_validation_empty_database() {
        let config = Config::for_database("");
        assert!(matches!(config.validate(), Err(crate::Error::Config(_))));

        let config = Config::for_database("/");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_rejects_zero_batch() {
        let result = Config::from_toml_str(
            r#"
            [cluster]
            database = "local"

            [execution]
            bulk_upsert_batch_size = 0
            "#,
        );
        assert!(matches!(result, Err(crate::Error::Config(_))));
    }

    #[test]
    fn test_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[cluster]\ndatabase = \"local\"\ntables_path = \"t\"").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.cluster.tables_path, "t");
    }

    #[test]
    fn test_config_missing_file() {
        let result = Config::from_file(std::path::Path::new("/nonexistent/sth.toml"));
        assert!(matches!(result, Err(crate::Error::Io(_))));
    }
}
