//! Configuration module
//!
//! Handles finding, loading and saving the orchestrator configuration.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration file locations searched in the working directory
const LOCAL_CONFIG_FILES: &[&str] = &["runboard.yaml", "runboard.yml", "runboard.json"];

/// Application configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Dashboard server address
    pub server_url: String,

    /// Path prefix under which the server mounts its API
    pub api_prefix: String,

    /// Status poll cadence in milliseconds
    pub poll_interval_ms: u64,

    /// HTTP timeout in seconds for non-streaming calls
    pub timeout_secs: u64,

    /// Batch concurrency used when none is given
    pub default_concurrency: u32,

    /// Batch delay in milliseconds used when none is given
    pub default_delay_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:7777".to_string(),
            api_prefix: "/api".to_string(),
            poll_interval_ms: 1000,
            timeout_secs: 30,
            default_concurrency: 1,
            default_delay_ms: 0,
        }
    }
}

impl AppConfig {
    /// Find a configuration file: working directory first, then the user config dir
    pub fn find() -> Option<PathBuf> {
        LOCAL_CONFIG_FILES
            .iter()
            .map(PathBuf::from)
            .chain(Self::user_config_path())
            .find(|p| p.exists())
    }

    /// `<config_dir>/runboard/config.yaml`
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("runboard").join("config.yaml"))
    }

    /// Load from the first file [`find`](Self::find) locates, or defaults
    pub fn load_default() -> Result<Self> {
        match Self::find() {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = if is_yaml_file(path) {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if is_yaml_file(path) {
            serde_yaml::to_string(self).context("Failed to serialize config")?
        } else {
            serde_json::to_string_pretty(self).context("Failed to serialize config")?
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.server_url.trim().is_empty() {
            bail!("server_url must not be empty");
        }
        if self.poll_interval_ms == 0 {
            bail!("poll_interval_ms must be greater than 0");
        }
        if self.timeout_secs == 0 {
            bail!("timeout_secs must be greater than 0");
        }
        if self.default_concurrency == 0 {
            bail!("default_concurrency must be at least 1");
        }
        Ok(())
    }

    /// Base URL of the API: server address plus prefix
    pub fn api_base_url(&self) -> String {
        let prefix = self.api_prefix.trim_matches('/');
        let server = self.server_url.trim_end_matches('/');
        if prefix.is_empty() {
            server.to_string()
        } else {
            format!("{server}/{prefix}")
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .map(|e| e == "yaml" || e == "yml")
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_millis(1000));
        assert_eq!(config.api_base_url(), "http://localhost:7777/api");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_api_base_url_normalization() {
        let mut config = AppConfig {
            server_url: "http://dash:8080/".into(),
            api_prefix: "api/".into(),
            ..AppConfig::default()
        };
        assert_eq!(config.api_base_url(), "http://dash:8080/api");
        config.api_prefix = String::new();
        assert_eq!(config.api_base_url(), "http://dash:8080");
    }

    #[test]
    fn test_validate() {
        let config = AppConfig {
            poll_interval_ms: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());

        let config = AppConfig {
            default_concurrency: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("runboard.yaml");
        let config = AppConfig {
            server_url: "http://dash:9000".into(),
            default_concurrency: 4,
            ..AppConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(AppConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_partial_json() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("runboard.json");
        std::fs::write(&path, r#"{"poll_interval_ms": 250}"#).unwrap();
        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.server_url, "http://localhost:7777");
    }

    #[test]
    fn test_load_invalid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("runboard.yaml");
        std::fs::write(&path, "timeout_secs: 0\n").unwrap();
        assert!(AppConfig::load(&path).is_err());
        assert!(AppConfig::load(dir.path().join("missing.yaml")).is_err());
    }
}
