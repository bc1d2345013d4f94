//! Store configuration (TOML + environment).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::{Dialect, QueryCatalog};
use crate::error::{OperationResult, StoreError};

/// Connection and statement settings for a [`crate::PageStore`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoreConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Inferred from the URL scheme when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dialect: Option<Dialect>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long the physical pool waits for a free connection before giving up.
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,

    /// SQLite only: create the database file if it does not exist.
    #[serde(default = "default_create_if_missing")]
    pub create_if_missing: bool,

    /// Statement overrides keyed by operation key (e.g. `get_page = "..."`).
    #[serde(default)]
    pub queries: HashMap<String, String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            dialect: None,
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
            create_if_missing: default_create_if_missing(),
            queries: HashMap::new(),
        }
    }
}

// Default value functions for serde
fn default_database_url() -> String {
    "sqlite://pagestore.db".to_string()
}

fn default_max_connections() -> u32 {
    30
}

fn default_acquire_timeout_secs() -> u64 {
    30
}

fn default_create_if_missing() -> bool {
    true
}

impl StoreConfig {
    /// A default config pointing at `database_url`.
    pub fn with_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(content: &str) -> OperationResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn from_path(path: &Path) -> OperationResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StoreError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load config, then apply `DATABASE_URL` from the environment.
    ///
    /// Priority order (highest to lowest):
    /// 1. `explicit` path (must exist)
    /// 2. ./pagestore.toml
    /// 3. ~/.pagestore/config.toml
    /// 4. Built-in defaults
    pub fn load(explicit: Option<&Path>) -> OperationResult<Self> {
        let config = match explicit {
            Some(path) => Self::from_path(path)?,
            None => match Self::candidate_paths().into_iter().find(|p| p.exists()) {
                Some(path) => {
                    info!("Loaded configuration from {}", path.display());
                    Self::from_path(&path)?
                }
                None => {
                    debug!("No pagestore config file found, using defaults");
                    Self::default()
                }
            },
        };
        Ok(config.with_env_overrides())
    }

    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("pagestore.toml")];
        if let Some(dir) = config_dir() {
            paths.push(dir.join("config.toml"));
        }
        paths
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            debug!("DATABASE_URL overrides configured database_url");
            self.database_url = url;
        }
        self
    }

    /// Explicit dialect, else the one implied by the URL scheme.
    pub fn resolved_dialect(&self) -> OperationResult<Dialect> {
        self.dialect
            .or_else(|| Dialect::from_url(&self.database_url))
            .ok_or_else(|| {
                StoreError::Config(format!(
                    "cannot infer dialect from database_url '{}'",
                    self.database_url
                ))
            })
    }

    /// Built-in statements for the resolved dialect plus `[queries]` overrides.
    pub fn catalog(&self) -> OperationResult<QueryCatalog> {
        QueryCatalog::with_overrides(self.resolved_dialect()?, &self.queries)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

/// ~/.pagestore
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".pagestore"))
}
