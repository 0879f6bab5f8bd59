//! Configuration loader with precedence handling
//!
//! Layers, lowest to highest: defaults, `$XDG_CONFIG_HOME/keylens/config.json`,
//! `KEYLENS_*` environment variables, command line overrides.

use crate::config::{Config, ConfigSource};
use keylens_core::{
    constants::{
        KEYLENS_LEVELS_VAR, KEYLENS_MAX_KEYS_VAR, KEYLENS_SIMILARITY_VAR,
        KEYLENS_SNAPSHOT_DIR_VAR, KEYLENS_SOURCE_URL_VAR, KEYLENS_STORE_URL_VAR,
        KEYLENS_WORKERS_VAR,
    },
    Error, Result,
};
use keylens_utils::XdgPaths;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Values supplied on the command line; `None` leaves the lower layers alone
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub store_url: Option<String>,
    pub source_url: Option<String>,
    pub workers: Option<usize>,
    pub levels: Option<usize>,
    pub similarity: Option<f64>,
    pub prefix_guard: Option<f64>,
    pub max_keys: Option<usize>,
    pub snapshot_dir: Option<PathBuf>,
}

impl CliOverrides {
    fn is_empty(&self) -> bool {
        self.store_url.is_none()
            && self.source_url.is_none()
            && self.workers.is_none()
            && self.levels.is_none()
            && self.similarity.is_none()
            && self.prefix_guard.is_none()
            && self.max_keys.is_none()
            && self.snapshot_dir.is_none()
    }
}

/// Configuration loader that handles precedence
pub struct ConfigLoader {
    /// Explicit config file; defaults to the XDG location
    config_file: Option<PathBuf>,
    /// Command line overrides applied last
    overrides: CliOverrides,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            config_file: None,
            overrides: CliOverrides::default(),
        }
    }

    /// Read the config file from `path` instead of the XDG location
    pub fn config_file(mut self, path: PathBuf) -> Self {
        self.config_file = Some(path);
        self
    }

    /// Set command line overrides
    pub fn overrides(mut self, overrides: CliOverrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Load configuration with full precedence handling
    pub fn load(self) -> Result<Config> {
        let path = self
            .config_file
            .clone()
            .unwrap_or_else(XdgPaths::config_file);

        let mut config = match Self::load_from_file(&path)? {
            Some(file_config) => {
                tracing::debug!(path = %path.display(), "loaded config file");
                file_config
            }
            None => Config::default(),
        };

        Self::apply_env(&mut config)?;
        Self::apply_cli(&mut config, &self.overrides);

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file; `None` when it does not exist
    pub fn load_from_file(path: &Path) -> Result<Option<Config>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::file_system(path, "read config file", e))?;

        let mut config: Config = serde_json::from_str(&content).map_err(|e| {
            Error::configuration(format!("invalid config file '{}': {e}", path.display()))
        })?;
        config.source = ConfigSource::ConfigFile(path.to_path_buf());

        Ok(Some(config))
    }

    /// Override with environment variables
    fn apply_env(config: &mut Config) -> Result<()> {
        let mut applied = false;

        if let Ok(url) = std::env::var(KEYLENS_STORE_URL_VAR) {
            config.store.url = url;
            applied = true;
        }

        if let Ok(url) = std::env::var(KEYLENS_SOURCE_URL_VAR) {
            config.store.source_url = Some(url);
            applied = true;
        }

        if let Some(workers) = env_parse::<usize>(KEYLENS_WORKERS_VAR)? {
            config.ingest.workers = workers;
            applied = true;
        }

        if let Some(levels) = env_parse::<usize>(KEYLENS_LEVELS_VAR)? {
            config.report.levels = levels;
            applied = true;
        }

        if let Some(similarity) = env_parse::<f64>(KEYLENS_SIMILARITY_VAR)? {
            config.report.similarity = similarity;
            applied = true;
        }

        if let Some(max_keys) = env_parse::<usize>(KEYLENS_MAX_KEYS_VAR)? {
            config.report.max_keys = Some(max_keys);
            applied = true;
        }

        if let Ok(dir) = std::env::var(KEYLENS_SNAPSHOT_DIR_VAR) {
            config.report.snapshot_dir = Some(PathBuf::from(dir));
            applied = true;
        }

        if applied {
            config.source = ConfigSource::EnvironmentVariable("KEYLENS_*".to_string());
        }

        Ok(())
    }

    /// Apply command line arguments (highest precedence)
    pub fn apply_cli(config: &mut Config, overrides: &CliOverrides) {
        if overrides.is_empty() {
            return;
        }

        if let Some(url) = &overrides.store_url {
            config.store.url = url.clone();
        }
        if let Some(url) = &overrides.source_url {
            config.store.source_url = Some(url.clone());
        }
        if let Some(workers) = overrides.workers {
            config.ingest.workers = workers;
        }
        if let Some(levels) = overrides.levels {
            config.report.levels = levels;
        }
        if let Some(similarity) = overrides.similarity {
            config.report.similarity = similarity;
        }
        if let Some(guard) = overrides.prefix_guard {
            config.report.prefix_guard = Some(guard);
        }
        if let Some(max_keys) = overrides.max_keys {
            config.report.max_keys = Some(max_keys);
        }
        if let Some(dir) = &overrides.snapshot_dir {
            config.report.snapshot_dir = Some(dir.clone());
        }

        config.source = ConfigSource::CommandLine;
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn env_parse<T: FromStr>(var: &str) -> Result<Option<T>> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::configuration(format!("{var} has an invalid value: '{raw}'"))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    const ALL_VARS: &[&str] = &[
        KEYLENS_STORE_URL_VAR,
        KEYLENS_SOURCE_URL_VAR,
        KEYLENS_WORKERS_VAR,
        KEYLENS_LEVELS_VAR,
        KEYLENS_SIMILARITY_VAR,
        KEYLENS_MAX_KEYS_VAR,
        KEYLENS_SNAPSHOT_DIR_VAR,
    ];

    fn clear_env() {
        for var in ALL_VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_missing_file_gives_defaults() {
        clear_env();
        let temp = TempDir::new().unwrap();
        let config = ConfigLoader::new()
            .config_file(temp.path().join("absent.json"))
            .load()
            .unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    #[serial]
    fn test_precedence_file_env_cli() {
        clear_env();
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(
            &path,
            r#"{"store": {"url": "redis://file:6379"}, "report": {"levels": 4, "similarity": 0.3}}"#,
        )
        .unwrap();

        let config = ConfigLoader::new().config_file(path.clone()).load().unwrap();
        assert_eq!(config.store.url, "redis://file:6379");
        assert_eq!(config.report.levels, 4);
        assert_eq!(config.source, ConfigSource::ConfigFile(path.clone()));

        std::env::set_var(KEYLENS_LEVELS_VAR, "2");
        let config = ConfigLoader::new().config_file(path.clone()).load().unwrap();
        assert_eq!(config.report.levels, 2);
        assert_eq!(config.report.similarity, 0.3);
        assert!(matches!(config.source, ConfigSource::EnvironmentVariable(_)));

        let config = ConfigLoader::new()
            .config_file(path)
            .overrides(CliOverrides {
                levels: Some(6),
                ..Default::default()
            })
            .load()
            .unwrap();
        assert_eq!(config.report.levels, 6);
        assert_eq!(config.source, ConfigSource::CommandLine);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_source_url_from_env_and_cli() {
        clear_env();
        let temp = TempDir::new().unwrap();
        let absent = temp.path().join("absent.json");

        std::env::set_var(KEYLENS_SOURCE_URL_VAR, "redis://cache:6379");
        let config = ConfigLoader::new().config_file(absent.clone()).load().unwrap();
        assert_eq!(config.store.source_url.as_deref(), Some("redis://cache:6379"));

        let config = ConfigLoader::new()
            .config_file(absent)
            .overrides(CliOverrides {
                source_url: Some("memory".to_string()),
                ..Default::default()
            })
            .load()
            .unwrap();
        assert_eq!(config.store.source_url.as_deref(), Some("memory"));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_env_value_is_rejected() {
        clear_env();
        std::env::set_var(KEYLENS_WORKERS_VAR, "many");
        let temp = TempDir::new().unwrap();
        let result = ConfigLoader::new()
            .config_file(temp.path().join("absent.json"))
            .load();
        assert!(matches!(result, Err(Error::Configuration { .. })));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_file_is_rejected() {
        clear_env();
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(ConfigLoader::new().config_file(path).load().is_err());
    }
}
