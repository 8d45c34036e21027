//! Service configuration
//!
//! Loaded from an optional file plus `ABISTORAGE__SECTION__KEY` environment
//! variables. Every setting has a default, so an empty source is a valid
//! configuration (in-memory store, no tokens).

use crate::metrics::{CachePolicy, ExportConfig, DEFAULT_PREFIX};
use crate::store::{ScanConfig, DEFAULT_FETCH_CONCURRENCY, DEFAULT_PAGE_SIZE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

pub const ENV_PREFIX: &str = "ABISTORAGE";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub metrics: MetricsSettings,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub sqlite_url: String,
    pub page_size: usize,
    pub fetch_concurrency: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            sqlite_url: "sqlite://abistorage.db?mode=rwc".to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
        }
    }
}

impl StoreConfig {
    pub fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            page_size: self.page_size,
            fetch_concurrency: self.fetch_concurrency,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSettings {
    pub max_age_secs: u64,
    pub stale_while_revalidate_secs: u64,
    pub prefix: String,
    pub include_process_metrics: bool,
    /// Hosts that get their own metrics cache entry; all others share one
    pub origins: Vec<String>,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            max_age_secs: 600,
            stale_while_revalidate_secs: 3600,
            prefix: DEFAULT_PREFIX.to_string(),
            include_process_metrics: false,
            origins: Vec::new(),
        }
    }
}

impl MetricsSettings {
    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            max_age: Duration::from_secs(self.max_age_secs),
            stale_while_revalidate: Duration::from_secs(self.stale_while_revalidate_secs),
        }
    }

    pub fn export_config(&self) -> ExportConfig {
        ExportConfig {
            prefix: self.prefix.clone(),
            include_process_metrics: self.include_process_metrics,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Bearer token to owner
    pub tokens: HashMap<String, String>,
}

fn is_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

impl AppConfig {
    /// Load from `path` (if any) and the environment
    pub fn load(path: Option<&str>) -> ConfigResult<Self> {
        Self::build(
            path,
            ::config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("metrics.origins"),
        )
    }

    pub fn from_file(path: &str) -> ConfigResult<Self> {
        Self::load(Some(path))
    }

    fn build(path: Option<&str>, env: ::config::Environment) -> ConfigResult<Self> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::with_name(path));
        }

        let settings = builder
            .add_source(env)
            .build()
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        let config: AppConfig = settings
            .try_deserialize()
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.bind_addr()?;

        if self.store.page_size == 0 {
            return Err(ConfigError::Invalid("store.page_size must be positive".into()));
        }
        if self.store.fetch_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "store.fetch_concurrency must be positive".into(),
            ));
        }
        if !is_metric_name(&self.metrics.prefix) {
            return Err(ConfigError::Invalid(format!(
                "metrics.prefix {:?} is not a valid metric name",
                self.metrics.prefix
            )));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> ConfigResult<SocketAddr> {
        self.server
            .bind_addr
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("server.bind_addr: {e}")))
    }
}
