use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use validator::Validate;

use crate::feature_catalog::Study;

pub const DEFAULT_ENDPOINT: &str = "https://bigquery.googleapis.com/bigquery/v2";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Analysis settings with validation
#[derive(Clone, Debug, Validate, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    /// Groups (and pair counts) must be strictly larger than this
    #[validate(range(
        min = 5,
        max = 50,
        message = "Minimum sample size must be between 5 and 50"
    ))]
    pub min_samples: u32,

    /// Study used when a command does not name one
    pub default_study: Study,

    /// Rows shown when printing a scan result
    #[validate(range(
        min = 1,
        max = 1000,
        message = "Display rows must be between 1 and 1000"
    ))]
    pub display_rows: usize,

    /// Absent until a project is configured; only needed to execute queries
    #[validate(nested)]
    pub warehouse: Option<WarehouseConfig>,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            min_samples: 25,
            default_study: Study::Ucec,
            display_rows: 25,
            warehouse: None,
        }
    }
}

/// BigQuery connection settings
#[derive(Clone, Debug, Validate, Serialize, Deserialize)]
pub struct WarehouseConfig {
    /// Billing project jobs run in
    #[validate(length(min = 1, message = "BigQuery project id cannot be empty"))]
    pub project_id: String,

    #[validate(length(min = 1, message = "BigQuery endpoint cannot be empty"))]
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub location: Option<String>,

    /// Per-request timeout, also the bound on waiting for a job to finish
    #[validate(range(
        min = 1000,
        max = 600000,
        message = "Timeout must be between 1000 and 600000 ms"
    ))]
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_use_query_cache")]
    pub use_query_cache: bool,

    /// OAuth2 bearer token; read from the environment, never written out
    #[serde(skip_serializing, default)]
    pub access_token: Option<String>,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_timeout_ms() -> u64 {
    60_000
}

fn default_use_query_cache() -> bool {
    true
}

impl WarehouseConfig {
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            endpoint: default_endpoint(),
            location: None,
            timeout_ms: default_timeout_ms(),
            use_query_cache: default_use_query_cache(),
            access_token: None,
        }
    }

    /// Read `BIGQUERY_*` variables; `None` when no project is set.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let project_id = match env::var("BIGQUERY_PROJECT") {
            Ok(project) if !project.trim().is_empty() => project,
            _ => return Ok(None),
        };

        let config = Self {
            project_id,
            endpoint: env::var("BIGQUERY_ENDPOINT").unwrap_or_else(|_| default_endpoint()),
            location: env::var("BIGQUERY_LOCATION").ok(),
            timeout_ms: parse_env_var("BIGQUERY_TIMEOUT_MS", "60000")?,
            use_query_cache: parse_env_var("BIGQUERY_USE_QUERY_CACHE", "true")?,
            access_token: env::var("BIGQUERY_ACCESS_TOKEN").ok(),
        };

        config.validate()?;
        Ok(Some(config))
    }
}

impl ExplorerConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            min_samples: parse_env_var("REGULOME_MIN_SAMPLES", "25")?,
            default_study: parse_env_var("REGULOME_STUDY", "UCEC")?,
            display_rows: parse_env_var("REGULOME_DISPLAY_ROWS", "25")?,
            warehouse: WarehouseConfig::from_env()?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;

        let mut config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        // the token never lives in the file
        if let Some(warehouse) = config.warehouse.as_mut() {
            if warehouse.access_token.is_none() {
                warehouse.access_token = env::var("BIGQUERY_ACCESS_TOKEN").ok();
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides and re-validate
    pub fn with_overrides(mut self, cli: CliOverrides) -> Result<Self, ConfigError> {
        if let Some(min_samples) = cli.min_samples {
            self.min_samples = min_samples;
        }
        if let Some(study) = cli.study {
            self.default_study = study;
        }
        if let Some(display_rows) = cli.display_rows {
            self.display_rows = display_rows;
        }
        if let Some(project_id) = cli.project_id {
            match self.warehouse.as_mut() {
                Some(warehouse) => warehouse.project_id = project_id,
                None => {
                    let mut warehouse = WarehouseConfig::new(project_id);
                    warehouse.access_token = env::var("BIGQUERY_ACCESS_TOKEN").ok();
                    self.warehouse = Some(warehouse);
                }
            }
        }

        self.validate()?;
        Ok(self)
    }
}

/// Values given on the command line (parsed by clap in the binary)
#[derive(Clone, Debug, Default)]
pub struct CliOverrides {
    pub min_samples: Option<u32>,
    pub study: Option<Study>,
    pub display_rows: Option<usize>,
    pub project_id: Option<String>,
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}
