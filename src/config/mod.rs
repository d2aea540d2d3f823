//! Configuration management for kbctl
//!
//! Handles loading, saving, and validating configuration from TOML files.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Knowledge base service base URL
    #[serde(default = "default_service_url")]
    pub service_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Polling configuration
    #[serde(default)]
    pub poll: PollConfig,

    /// Index sync configuration
    #[serde(default)]
    pub sync: SyncConfig,

    /// Query configuration
    #[serde(default)]
    pub query: QueryConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// Auto-refresh polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Interval between job-list refreshes while a job is processing
    #[serde(default = "default_jobs_poll_interval")]
    pub jobs_interval_secs: u64,

    /// Interval between index-list refreshes while an index is syncing
    #[serde(default = "default_indexes_poll_interval")]
    pub indexes_interval_secs: u64,
}

/// Parameters sent when triggering an index sync
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Embedding model identifier (resolved server-side)
    #[serde(default = "default_sync_embedding_model")]
    pub embedding_model: String,

    /// Chunk size as a ratio of the model context
    #[serde(default = "default_sync_chunk_ratio")]
    pub chunk_ratio: f64,

    /// Chunk overlap ratio
    #[serde(default = "default_sync_overlap_ratio")]
    pub overlap_ratio: f64,
}

/// Query configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Default number of results per query
    #[serde(default = "default_query_top_k")]
    pub default_top_k: usize,
}

/// Paths used by kbctl (derived, never serialized)
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    pub base_dir: PathBuf,
    pub config_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_url: default_service_url(),
            request_timeout_secs: default_request_timeout(),
            poll: PollConfig::default(),
            sync: SyncConfig::default(),
            query: QueryConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            jobs_interval_secs: default_jobs_poll_interval(),
            indexes_interval_secs: default_indexes_poll_interval(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            embedding_model: default_sync_embedding_model(),
            chunk_ratio: default_sync_chunk_ratio(),
            overlap_ratio: default_sync_overlap_ratio(),
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_top_k: default_query_top_k(),
        }
    }
}

impl Config {
    /// Get the default base directory for kbctl (~/.kbctl)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".kbctl")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    pub(crate) fn init_paths(&mut self, base_dir: Option<PathBuf>) {
        let base = base_dir.unwrap_or_else(Self::default_base_dir);
        self.paths = PathsConfig {
            config_file: base.join("config.toml"),
            base_dir: base,
        };
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        let base = config_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        config.paths = PathsConfig {
            config_file: config_path.to_path_buf(),
            base_dir: base,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a base directory, falling back to defaults
    /// when no config file exists yet.
    pub fn load_from(base_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Config::default();
        config.init_paths(base_dir);

        if config.paths.config_file.exists() {
            debug!("Loading config from {:?}", config.paths.config_file);
            let content = std::fs::read_to_string(&config.paths.config_file)?;
            let mut loaded: Config = toml::from_str(&content)?;
            loaded.paths = config.paths;
            config = loaded;
            config.validate()?;
        } else {
            debug!("No config file found, using defaults");
        }

        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;
        info!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.service_url)
            .map_err(|e| Error::Config(format!("Invalid service_url: {}", e)))?;

        if self.poll.jobs_interval_secs == 0 || self.poll.indexes_interval_secs == 0 {
            return Err(Error::Config(
                "poll intervals must be at least 1 second".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.sync.chunk_ratio) || self.sync.chunk_ratio == 0.0 {
            return Err(Error::Config(
                "sync.chunk_ratio must be in (0, 1]".to_string(),
            ));
        }

        if !(0.0..1.0).contains(&self.sync.overlap_ratio) {
            return Err(Error::Config(
                "sync.overlap_ratio must be in [0, 1)".to_string(),
            ));
        }

        if self.query.default_top_k == 0 {
            return Err(Error::Config(
                "query.default_top_k must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll.jobs_interval_secs, 3);
        assert_eq!(config.poll.indexes_interval_secs, 5);
        assert_eq!(config.query.default_top_k, 5);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            service_url = "http://localhost:8000"

            [poll]
            jobs_interval_secs = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.service_url, "http://localhost:8000");
        assert_eq!(config.poll.jobs_interval_secs, 2);
        assert_eq!(config.poll.indexes_interval_secs, 5);
        assert_eq!(config.sync.chunk_ratio, 0.8);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.service_url = "not a url".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.poll.jobs_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.sync.overlap_ratio = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.service_url = "http://localhost:9000".to_string();
        config.sync.embedding_model = "test-model".to_string();
        config.init_paths(Some(dir.path().to_path_buf()));
        config.save().unwrap();

        let loaded = Config::load(&dir.path().join("config.toml")).unwrap();
        assert_eq!(loaded.service_url, "http://localhost:9000");
        assert_eq!(loaded.sync.embedding_model, "test-model");
    }
}
