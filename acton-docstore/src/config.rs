//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: ACTON_, nested keys separated by `__`,
//!    e.g. `ACTON_STORE__DATABASE=app`)
//! 2. Current working directory: ./config.toml
//! 3. XDG config directory: ~/.config/acton-docstore/{service_name}/config.toml
//! 4. System directory: /etc/acton-docstore/{service_name}/config.toml
//! 5. Default values
//!
//! ```toml
//! [service]
//! name = "orders"
//! log_level = "debug"
//!
//! [store]
//! uri = "mongodb://localhost:27017"
//! database = "orders"
//! ```

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::pagination::{PagingQuery, DEFAULT_PAGE_SIZE};

const CONFIG_DIR: &str = "acton-docstore";
const ENV_PREFIX: &str = "ACTON_";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    #[serde(default)]
    pub service: ServiceConfig,

    /// Document store configuration
    #[serde(default)]
    pub store: StoreConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Environment (dev, staging, production)
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
            environment: default_environment(),
        }
    }
}

/// Document store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Connection URI
    #[serde(default = "default_store_uri")]
    pub uri: String,

    /// Default database for DAOs that do not name one
    #[serde(default)]
    pub database: String,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Maximum connection retry attempts
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay between retries in seconds (doubles on each attempt)
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,

    /// Log every store command at debug level
    #[serde(default)]
    pub log_commands: bool,

    /// Page size used when a request does not specify one
    #[serde(default = "default_page_size")]
    pub default_page_size: i64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: default_store_uri(),
            database: String::new(),
            connect_timeout_secs: default_connect_timeout(),
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay(),
            log_commands: false,
            default_page_size: default_page_size(),
        }
    }
}

impl StoreConfig {
    /// Connection timeout as a `Duration`
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// The default database, if configured
    pub fn default_database(&self) -> Option<&str> {
        Some(self.database.as_str()).filter(|db| !db.is_empty())
    }

    /// A page request; a missing or non-positive count uses `default_page_size`
    pub fn paging(&self, page: i64, count: Option<i64>) -> PagingQuery {
        let count = count.filter(|c| *c > 0).unwrap_or(self.default_page_size);
        PagingQuery::new(page.max(0), count)
    }
}

fn default_service_name() -> String {
    CONFIG_DIR.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_environment() -> String {
    "dev".to_string()
}

fn default_store_uri() -> String {
    "mongodb://localhost:27017".to_string()
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    1
}

fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl Config {
    /// Load configuration from all sources
    ///
    /// The service name is inferred from the binary name.
    pub fn load() -> Result<Self> {
        let service_name = std::env::current_exe()
            .ok()
            .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(|| CONFIG_DIR.to_string());

        Self::load_for_service(&service_name)
    }

    /// Load configuration for a specific service name
    pub fn load_for_service(service_name: &str) -> Result<Self> {
        let config_paths = Self::find_config_paths(service_name);

        tracing::debug!("Searching for config files in order:");
        for path in &config_paths {
            tracing::debug!("  - {}", path.display());
        }

        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Lowest priority first so higher priority files override
        for path in config_paths.iter().rev() {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config = figment.extract()?;
        Ok(config)
    }

    /// Load configuration from a specific file
    ///
    /// Bypasses the search path; environment variables still apply.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        Ok(config)
    }

    /// Config file paths for a service, highest priority first
    fn find_config_paths(service_name: &str) -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        let xdg_dirs = xdg::BaseDirectories::with_prefix(CONFIG_DIR);
        let config_file_path = Path::new(service_name).join("config.toml");
        if let Some(path) = xdg_dirs.find_config_file(&config_file_path) {
            paths.push(path);
        }

        paths.push(
            PathBuf::from("/etc")
                .join(CONFIG_DIR)
                .join(service_name)
                .join("config.toml"),
        );

        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service.log_level, "info");
        assert_eq!(config.store.uri, "mongodb://localhost:27017");
        assert_eq!(config.store.default_page_size, 20);
        assert_eq!(config.store.default_database(), None);
        assert_eq!(config.store.connect_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[service]
name = "orders"

[store]
database = "orders_db"
max_retries = 5
"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.service.name, "orders");
        assert_eq!(config.service.log_level, "info");
        assert_eq!(config.store.default_database(), Some("orders_db"));
        assert_eq!(config.store.max_retries, 5);
        assert_eq!(config.store.retry_delay_secs, 1);
    }

    #[test]
    fn test_paging_uses_default_page_size() {
        let store = StoreConfig {
            default_page_size: 50,
            ..Default::default()
        };
        assert_eq!(store.paging(2, None), PagingQuery::new(2, 50));
        assert_eq!(store.paging(-1, Some(0)), PagingQuery::new(0, 50));
        assert_eq!(store.paging(1, Some(10)).skip(), 10);
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.store.max_retries, 3);
    }

    #[test]
    fn test_config_paths_order() {
        let paths = Config::find_config_paths("orders");
        assert_eq!(paths.first(), Some(&PathBuf::from("config.toml")));
        assert_eq!(
            paths.last(),
            Some(&PathBuf::from("/etc/acton-docstore/orders/config.toml"))
        );
    }
}
