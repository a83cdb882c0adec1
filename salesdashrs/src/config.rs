//! Configuration system for SalesDash.
//!
//! Supports TOML-based configuration; every section and field has a default,
//! so an empty file (or no file at all) is a valid configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SalesDashError};

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub filters: FilterConfig,
}

/// Storage engine settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// DuckDB database file (default: `my.db`).
    pub path: String,
    /// Denormalized view queried by the dashboard (default: `order_details`).
    pub view: String,
    /// Maximum concurrent executions (default: 16).
    pub max_concurrency: usize,
}

/// Query-result cache settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Serve repeated queries from memory (default: true).
    pub enabled: bool,
    /// Entry lifetime in seconds, 0 = never expire (default: 3600).
    pub ttl_secs: u64,
    /// Maximum cached results (default: 256).
    pub max_size: usize,
}

/// Filter input settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Store selection meaning "no store filter" (default: `all`).
    pub all_stores: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "my.db".to_string(),
            view: crate::query_builder::ORDER_DETAILS_VIEW.to_string(),
            max_concurrency: 16,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 3600,
            max_size: 256,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            all_stores: crate::models::ALL_STORES.to_string(),
        }
    }
}

impl DashboardConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| SalesDashError::Config(format!("failed to read config file: {e}")))?;
        Self::from_toml(&contents)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| SalesDashError::Config(format!("failed to parse config: {e}")))
    }

    /// Load from default locations (env var, cwd, user config dir, or defaults).
    ///
    /// Search order:
    /// 1. `SALESDASH_CONFIG` environment variable
    /// 2. `./salesdash.toml` (current directory)
    /// 3. `~/.config/salesdash/config.toml` (user config dir)
    /// 4. Built-in defaults
    pub fn load_default() -> Self {
        if let Ok(path) = std::env::var("SALESDASH_CONFIG") {
            match Self::from_file(&path) {
                Ok(cfg) => {
                    tracing::info!(path = %path, "loaded config from SALESDASH_CONFIG");
                    return cfg;
                }
                Err(e) => tracing::warn!(path = %path, error = %e, "ignoring SALESDASH_CONFIG"),
            }
        }

        if let Ok(cfg) = Self::from_file("salesdash.toml") {
            tracing::info!("loaded config from ./salesdash.toml");
            return cfg;
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("salesdash").join("config.toml");
            if let Ok(cfg) = Self::from_file(&user_config) {
                tracing::info!(path = %user_config.display(), "loaded config from user config dir");
                return cfg;
            }
        }

        tracing::debug!("no config file found, using defaults");
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = DashboardConfig::default();
        assert_eq!(cfg.database.path, "my.db");
        assert_eq!(cfg.database.view, "order_details");
        assert_eq!(cfg.database.max_concurrency, 16);
        assert!(cfg.cache.enabled);
        assert_eq!(cfg.cache.ttl_secs, 3600);
        assert_eq!(cfg.filters.all_stores, "all");
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[database]
path = "/data/sales.duckdb"

[cache]
ttl_secs = 0
max_size = 8

[filters]
all_stores = "Все"
"#;
        let cfg = DashboardConfig::from_toml(toml).unwrap();
        assert_eq!(cfg.database.path, "/data/sales.duckdb");
        // Unset fields keep their defaults.
        assert_eq!(cfg.database.view, "order_details");
        assert_eq!(cfg.cache.ttl_secs, 0);
        assert_eq!(cfg.cache.max_size, 8);
        assert!(cfg.cache.enabled);
        assert_eq!(cfg.filters.all_stores, "Все");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = DashboardConfig::from_toml("[cache]\nmax_size = \"many\"").unwrap_err();
        assert!(matches!(err, SalesDashError::Config(_)));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("salesdash.toml");
        std::fs::write(&path, "[database]\nview = \"main.order_details\"\n").unwrap();
        let cfg = DashboardConfig::from_file(&path).unwrap();
        assert_eq!(cfg.database.view, "main.order_details");

        let missing = DashboardConfig::from_file(dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(SalesDashError::Config(_))));
    }
}
