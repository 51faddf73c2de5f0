use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GrantstoreConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GrantstoreConfig {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(url) = self.store.url.as_deref() {
            if url.trim().is_empty() {
                return Err("store.url must not be empty when set".into());
            }
        }
        if self.store.pool_size == 0 {
            return Err("store.pool_size must be > 0".into());
        }
        if self.store.timeout_ms == 0 {
            return Err("store.timeout_ms must be > 0".into());
        }
        if self.store.max_grant_entries == Some(0) {
            return Err("store.max_grant_entries must be > 0 when set".into());
        }
        Ok(())
    }
}

/// Backing store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Connection URL (e.g., "redis://localhost:6379").
    /// Absent: the adapter is disabled and every call fails with `StoreUnavailable`.
    #[serde(default)]
    pub url: Option<String>,

    /// Namespace prepended to every physical key
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Connection pool size
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Connection timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Keep at most this many members in each grant index (oldest dropped first)
    #[serde(default)]
    pub max_grant_entries: Option<usize>,
}

fn default_key_prefix() -> String {
    "oidc:".to_string()
}

fn default_pool_size() -> usize {
    10
}

fn default_timeout_ms() -> u64 {
    5000
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn is_enabled(&self) -> bool {
        self.url.is_some()
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            key_prefix: default_key_prefix(),
            pool_size: default_pool_size(),
            timeout_ms: default_timeout_ms(),
            max_grant_entries: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

pub mod loader {
    use super::GrantstoreConfig;
    use config::{Config, Environment, File};
    use std::path::PathBuf;

    /// Default configuration file looked up in the working directory.
    pub const DEFAULT_CONFIG_FILE: &str = "grantstore.toml";

    /// Bare connection string variable honored when no URL is configured.
    pub const REDIS_URL_ENV: &str = "REDIS_URL";

    pub fn load_config(path: Option<&str>) -> Result<GrantstoreConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_FILE));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        } else if path.is_some() {
            return Err(format!("config file not found: {}", pathbuf.display()));
        }
        // Environment variable overrides, e.g., GRANTSTORE__STORE__URL=redis://...
        builder = builder.add_source(
            Environment::with_prefix("GRANTSTORE")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let mut merged: GrantstoreConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;

        if merged.store.url.is_none() {
            merged.store.url = std::env::var(REDIS_URL_ENV)
                .ok()
                .filter(|url| !url.is_empty());
        }

        merged.validate()?;
        Ok(merged)
    }
}
